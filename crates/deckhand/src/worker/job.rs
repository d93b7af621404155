//! Job record and the state machine that governs it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Returns true once the job can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "uploaded",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single state change requested against a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobMutation {
    /// `uploaded -> processing`.
    Start,
    /// Records which step is in flight.
    BeginStep { label: String },
    /// Increments `steps_completed`.
    CompleteStep,
    /// `processing -> completed` with the produced artifacts.
    Complete { result_refs: Vec<String> },
    /// `uploaded | processing -> error`.
    Fail { error: String },
}

impl JobMutation {
    pub fn name(&self) -> &'static str {
        match self {
            JobMutation::Start => "start",
            JobMutation::BeginStep { .. } => "begin_step",
            JobMutation::CompleteStep => "complete_step",
            JobMutation::Complete { .. } => "complete",
            JobMutation::Fail { .. } => "fail",
        }
    }
}

/// One uploaded presentation and its processing progress.
///
/// The serialized form is the snapshot delivered to clients; the input
/// locator stays server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub job_id: String,
    pub filename: String,
    pub status: JobStatus,
    pub steps_completed: u32,
    pub total_steps: u32,
    /// Label of the step currently in flight.
    pub current_step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_size: u64,
    /// Storage locator of the uploaded input.
    #[serde(skip)]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result_refs: Vec<String>,
}

impl Job {
    pub(crate) fn new(job_id: String, filename: &str, total_steps: u32) -> Self {
        Self {
            job_id,
            filename: filename.to_string(),
            status: JobStatus::Uploaded,
            steps_completed: 0,
            total_steps,
            current_step: "Uploaded".to_string(),
            error: None,
            created_at: Utc::now(),
            completed_at: None,
            file_size: 0,
            source: None,
            result_refs: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Progress as a whole percentage.
    pub fn percent_complete(&self) -> u32 {
        if self.total_steps == 0 {
            return if self.status == JobStatus::Completed { 100 } else { 0 };
        }
        self.steps_completed * 100 / self.total_steps
    }

    /// Applies a mutation, or leaves the job untouched and returns
    /// `InvalidTransition`.
    pub fn apply(&mut self, mutation: JobMutation) -> Result<(), JobError> {
        match (self.status, mutation) {
            (JobStatus::Uploaded, JobMutation::Start) => {
                self.status = JobStatus::Processing;
                self.current_step = "Starting processing".to_string();
            }
            (JobStatus::Processing, JobMutation::BeginStep { label }) => {
                self.current_step = label;
            }
            (JobStatus::Processing, JobMutation::CompleteStep)
                if self.steps_completed < self.total_steps =>
            {
                self.steps_completed += 1;
            }
            (JobStatus::Processing, JobMutation::Complete { result_refs }) => {
                self.status = JobStatus::Completed;
                self.steps_completed = self.total_steps;
                self.current_step = "Complete".to_string();
                self.completed_at = Some(Utc::now());
                self.result_refs = result_refs;
            }
            (JobStatus::Uploaded | JobStatus::Processing, JobMutation::Fail { error }) => {
                self.status = JobStatus::Error;
                self.error = Some(error);
                self.completed_at = Some(Utc::now());
            }
            (from, mutation) => {
                return Err(JobError::InvalidTransition {
                    job_id: self.job_id.clone(),
                    from,
                    mutation: mutation.name(),
                });
            }
        }
        Ok(())
    }
}
