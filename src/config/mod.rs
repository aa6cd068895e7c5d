pub mod storage;
pub mod toml_config;

#[cfg(feature = "cli")]
mod args;

#[cfg(feature = "cli")]
pub use args::CliConfig;
pub use storage::LocalStorage;
pub use toml_config::TomlConfig;
