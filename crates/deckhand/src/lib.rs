pub mod broadcast;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod retrieval;
pub mod sanitize;
pub mod storage;
pub mod worker;

pub use broadcast::{JobProgressBroadcaster, JobStore, JobUpdate};
pub use config::{load_config, load_or_default, Config};
pub use error::{
    ConfigError, DeckhandError, JobError, ProcessError, Result, RetrievalError, StorageError,
};
pub use pipeline::{Pipeline, PipelineOutcome, ProcessingOptions, TOTAL_STEPS};
pub use worker::{Job, JobMutation, JobRunner, JobStatus};
