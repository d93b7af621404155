use std::path::PathBuf;
use thiserror::Error;

use crate::worker::job::JobStatus;

#[derive(Error, Debug)]
pub enum DeckhandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} cannot apply '{mutation}' while {from}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        mutation: &'static str,
    },

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to parse presentation: {0}")]
    ParseError(String),

    #[error("Unsupported presentation format: {0}")]
    UnsupportedFormat(String),

    #[error("Naming service unavailable: {0}")]
    NamingServiceUnavailable(String),

    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Locator escapes the storage root: {0}")]
    OutsideRoot(String),
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract DOCX text: {0}")]
    Docx(String),

    #[error("{0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, DeckhandError>;
