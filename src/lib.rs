pub mod analysis;
pub mod config;
pub mod core;
pub mod error;
pub mod fetcher;
pub mod indicators;
pub mod models;
pub mod sink;

pub use crate::core::orchestrator::{Pipeline, RunReport, SourceSet};
pub use error::PipelineError;
