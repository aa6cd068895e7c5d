pub mod onus_pipeline;

pub use onus_pipeline::OnusPipeline;
