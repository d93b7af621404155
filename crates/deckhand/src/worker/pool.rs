use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::error::JobError;
use crate::pipeline::{Pipeline, PipelineOutcome, ProcessingOptions};
use crate::worker::job::JobMutation;

/// Schedules pipeline runs as independent tasks.
///
/// At most `max_concurrent_jobs` pipelines run at once; the rest wait for a
/// permit in submission order.
#[derive(Clone)]
pub struct JobRunner {
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
    max_concurrent_jobs: usize,
}

impl JobRunner {
    pub fn new(pipeline: Arc<Pipeline>, max_concurrent_jobs: usize) -> Self {
        let max_concurrent_jobs = max_concurrent_jobs.max(1);
        info!("Job runner allows {} concurrent jobs", max_concurrent_jobs);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs)),
            max_concurrent_jobs,
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Pipelines currently holding a permit.
    pub fn running(&self) -> usize {
        self.max_concurrent_jobs - self.permits.available_permits()
    }

    /// Moves the job to `processing` and spawns its pipeline.
    ///
    /// The transition is committed and published before this returns, so the
    /// caller already observes `processing`. Must be called inside a tokio
    /// runtime.
    pub fn submit(
        &self,
        job_id: &str,
        options: ProcessingOptions,
    ) -> Result<JoinHandle<PipelineOutcome>, JobError> {
        let job = self.pipeline.tracker(job_id).record(JobMutation::Start)?;

        let span = info_span!("job", job_id = %job.job_id, filename = %job.filename);
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        let job_id = job.job_id;

        let handle = tokio::spawn(
            async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("Job runner closed before the job could start");
                        return PipelineOutcome::Abandoned;
                    }
                };
                pipeline.run(&job_id, options).await
            }
            .instrument(span),
        );

        Ok(handle)
    }
}
