//! Test harness for isolated job runs.
//!
//! `TestHarness` wires a store, a broadcaster, a pipeline and a runner over
//! temporary upload/output/documents directories. Collaborators can be
//! swapped for scripted ones.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use deckhand::pipeline::{Namers, PipelineConfig, PipelineServices};
use deckhand::processor::{HeuristicNamer, PptxConverter, PresentationConverter, ShapeNamer};
use deckhand::retrieval::{KeywordIndex, RetrievalIndex};
use deckhand::storage::{ArtifactStore, LocalArtifactStore};
use deckhand::{
    Job, JobProgressBroadcaster, JobRunner, JobStore, Pipeline, PipelineOutcome,
    ProcessingOptions, TOTAL_STEPS,
};

/// Collaborators to use instead of the defaults.
#[derive(Default)]
pub struct Overrides {
    pub index: Option<Arc<dyn RetrievalIndex>>,
    pub converter: Option<Arc<dyn PresentationConverter>>,
    pub max_concurrent_jobs: Option<usize>,
    pub notifier_capacity: Option<usize>,
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    pub documents_dir: PathBuf,
    pub store: Arc<JobStore>,
    pub broadcaster: JobProgressBroadcaster,
    pub artifacts: Arc<LocalArtifactStore>,
    pub index: Arc<dyn RetrievalIndex>,
    pub runner: JobRunner,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(Overrides::default())
    }

    pub fn with(overrides: Overrides) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        let upload_dir = base.join("uploads");
        let output_dir = base.join("outputs");
        let documents_dir = base.join("documents");
        std::fs::create_dir_all(&documents_dir).expect("Failed to create documents dir");

        let store = Arc::new(JobStore::new());
        let broadcaster = JobProgressBroadcaster::new(overrides.notifier_capacity.unwrap_or(256));
        let artifacts = Arc::new(LocalArtifactStore::new(&upload_dir, &output_dir));
        let index = overrides
            .index
            .unwrap_or_else(|| Arc::new(KeywordIndex::new(200)) as Arc<dyn RetrievalIndex>);
        let converter = overrides
            .converter
            .unwrap_or_else(|| Arc::new(PptxConverter::new()) as Arc<dyn PresentationConverter>);

        // No LLM in tests; every strategy names heuristically.
        let heuristic: Arc<dyn ShapeNamer> = Arc::new(HeuristicNamer);
        let services = PipelineServices {
            artifacts: artifacts.clone(),
            converter,
            index: Arc::clone(&index),
            namers: Namers::new(heuristic.clone(), heuristic.clone(), heuristic),
        };

        let config = Arc::new(PipelineConfig {
            documents_directory: documents_dir.clone(),
            context_results: 3,
        });
        let pipeline = Arc::new(Pipeline::new(
            config,
            services,
            Arc::clone(&store),
            broadcaster.clone(),
        ));
        let runner = JobRunner::new(pipeline, overrides.max_concurrent_jobs.unwrap_or(2));

        Self {
            temp_dir,
            upload_dir,
            output_dir,
            documents_dir,
            store,
            broadcaster,
            artifacts,
            index,
            runner,
        }
    }

    /// Stores `bytes` and creates an `uploaded` job for them.
    pub async fn upload(&self, filename: &str, bytes: &[u8]) -> Job {
        let locator = self
            .artifacts
            .store(filename, bytes)
            .await
            .expect("Failed to store upload");
        self.store
            .create_with_source(filename, TOTAL_STEPS, Some(locator), bytes.len() as u64)
            .expect("Failed to create job")
    }

    pub async fn upload_sample(&self) -> Job {
        self.upload("deck.pptx", &super::builders::sample_pptx()).await
    }

    pub fn write_document(&self, name: &str, text: &str) {
        std::fs::write(self.documents_dir.join(name), text).expect("Failed to write document");
    }

    /// Submits the job and waits for its pipeline to finish.
    pub async fn run(&self, job_id: &str, options: ProcessingOptions) -> PipelineOutcome {
        self.runner
            .submit(job_id, options)
            .expect("Failed to submit job")
            .await
            .expect("Pipeline task panicked")
    }
}
