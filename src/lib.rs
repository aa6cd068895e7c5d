pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::{LocalStorage, TomlConfig};

pub use crate::app::pipelines::OnusPipeline;
pub use crate::core::{
    apportionment::OnusCalculator, engine::OnusEngine, expansion::TermExpander,
    reference::ReferenceData, session::TermSet,
};
pub use crate::utils::error::{OnusError, Result};
