pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;
pub mod services;

pub use config::{NamingStrategy, PipelineConfig, ProcessingOptions};
pub use context::PipelineContext;
pub use error::PipelineError;
pub use progress::{PipelineStep, TOTAL_STEPS};
pub use runner::{Pipeline, PipelineOutcome};
pub use services::{Namers, PipelineServices};
