pub mod core;
mod stages;

pub use self::core::{Pipeline, PipelineReport, PipelineState};
