//! Shared handles for request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use deckhand::retrieval::RetrievalIndex;
use deckhand::storage::ArtifactStore;
use deckhand::{Config, ConfigError, JobProgressBroadcaster, JobRunner, JobStore, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub broadcaster: JobProgressBroadcaster,
    pub runner: JobRunner,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub index: Arc<dyn RetrievalIndex>,
    pub documents_dir: PathBuf,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let store = Arc::new(JobStore::new());
        let broadcaster = JobProgressBroadcaster::new(config.notifier_capacity);
        let pipeline = Pipeline::from_config(config, store, broadcaster)?;
        let runner = JobRunner::new(Arc::new(pipeline), config.max_concurrent_jobs);

        Ok(Self::new(runner, PathBuf::from(&config.documents_directory)))
    }

    /// Takes every shared handle from the runner's pipeline.
    pub fn new(runner: JobRunner, documents_dir: PathBuf) -> Self {
        let pipeline = Arc::clone(runner.pipeline());
        let services = pipeline.services();

        Self {
            store: Arc::clone(pipeline.store()),
            broadcaster: pipeline.broadcaster().clone(),
            artifacts: Arc::clone(&services.artifacts),
            index: Arc::clone(&services.index),
            runner,
            documents_dir,
        }
    }
}
