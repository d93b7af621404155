//! In-process job store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::error::JobError;
use crate::worker::job::{Job, JobMutation, JobStatus};

/// Attempts at drawing an unused id before giving up.
const MAX_ID_ATTEMPTS: usize = 16;

type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

struct Entry {
    /// Insertion order, used to break `created_at` ties.
    seq: u64,
    job: Job,
}

/// Per-status job totals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub uploaded: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

/// Authoritative map from job id to [`Job`].
///
/// Every mutation goes through the write lock, so updates to one job are
/// serialized and a reader never observes a half-applied transition.
pub struct JobStore {
    jobs: RwLock<HashMap<String, Entry>>,
    next_seq: AtomicU64,
    id_generator: IdGenerator,
}

impl JobStore {
    /// Creates an empty store that assigns UUID v4 ids.
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(|| uuid::Uuid::new_v4().to_string()))
    }

    /// Creates an empty store with a custom id source.
    pub fn with_id_generator(id_generator: IdGenerator) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            id_generator,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Inserts a new job in `uploaded` state and returns its id.
    pub fn create(&self, filename: &str, total_steps: u32) -> Result<String, JobError> {
        self.create_with_source(filename, total_steps, None, 0)
            .map(|job| job.job_id)
    }

    /// Inserts a new job that remembers where its input was stored.
    pub fn create_with_source(
        &self,
        filename: &str,
        total_steps: u32,
        source: Option<String>,
        file_size: u64,
    ) -> Result<Job, JobError> {
        let mut jobs = self.write();

        let job_id = (0..MAX_ID_ATTEMPTS)
            .map(|_| (self.id_generator)())
            .find(|id| !jobs.contains_key(id))
            .ok_or_else(|| {
                JobError::ResourceExhausted(format!(
                    "no unused job id after {} attempts",
                    MAX_ID_ATTEMPTS
                ))
            })?;

        let mut job = Job::new(job_id.clone(), filename, total_steps);
        job.source = source;
        job.file_size = file_size;

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        jobs.insert(
            job_id.clone(),
            Entry {
                seq,
                job: job.clone(),
            },
        );

        log::debug!("Created job {} for {}", job_id, filename);
        Ok(job)
    }

    /// Returns a snapshot of the job.
    pub fn get(&self, job_id: &str) -> Result<Job, JobError> {
        self.read()
            .get(job_id)
            .map(|entry| entry.job.clone())
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Applies a mutation atomically and returns the fresh snapshot.
    pub fn update(&self, job_id: &str, mutation: JobMutation) -> Result<Job, JobError> {
        let mut jobs = self.write();
        let entry = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        entry.job.apply(mutation)?;
        Ok(entry.job.clone())
    }

    /// Returns all jobs, most recently created first.
    pub fn list(&self) -> Vec<Job> {
        let jobs = self.read();
        let mut entries: Vec<&Entry> = jobs.values().collect();
        entries.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        entries.into_iter().map(|entry| entry.job.clone()).collect()
    }

    /// Removes a job and hands it back so the caller can clean up its
    /// artifacts. Removing an unknown id is a no-op.
    pub fn delete(&self, job_id: &str) -> Option<Job> {
        let removed = self.write().remove(job_id).map(|entry| entry.job);
        if removed.is_some() {
            log::debug!("Deleted job {}", job_id);
        }
        removed
    }

    /// Returns the count of jobs by status.
    pub fn counts(&self) -> JobCounts {
        let jobs = self.read();
        let mut counts = JobCounts::default();
        for entry in jobs.values() {
            match entry.job.status {
                JobStatus::Uploaded => counts.uploaded += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
