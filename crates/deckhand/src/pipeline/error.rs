use thiserror::Error;

use crate::error::{ProcessError, RetrievalError, StorageError};

/// Why a pipeline step failed.
///
/// Collaborator errors become `UpstreamFailure` carrying the collaborator's
/// own message, which is what the job records.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    UpstreamFailure(String),

    #[error("Failed to encode results: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Missing {0} from an earlier step")]
    MissingInput(&'static str),
}

impl From<ProcessError> for PipelineError {
    fn from(e: ProcessError) -> Self {
        PipelineError::UpstreamFailure(e.to_string())
    }
}

impl From<StorageError> for PipelineError {
    fn from(e: StorageError) -> Self {
        PipelineError::UpstreamFailure(e.to_string())
    }
}

impl From<RetrievalError> for PipelineError {
    fn from(e: RetrievalError) -> Self {
        PipelineError::UpstreamFailure(e.to_string())
    }
}
