//! Job progress broadcaster for real-time job status streaming.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::broadcast::job_store::JobStore;
use crate::error::JobError;
use crate::worker::job::{Job, JobMutation};

/// Default number of buffered updates per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Message pushed to live subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum JobUpdate {
    JobUpdate(Job),
}

impl JobUpdate {
    pub fn job(&self) -> &Job {
        match self {
            JobUpdate::JobUpdate(job) => job,
        }
    }

    pub fn into_job(self) -> Job {
        match self {
            JobUpdate::JobUpdate(job) => job,
        }
    }
}

/// Broadcasts job snapshots to every live subscriber.
///
/// Each receiver buffers up to `capacity` updates; a receiver that falls
/// further behind sees `Lagged(n)` and resumes from the oldest retained one.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobUpdate>>,
}

impl JobProgressBroadcaster {
    /// Creates a broadcaster with the given per-subscriber capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publishes a job snapshot to all subscribers.
    pub fn publish(&self, job: Job) {
        self.send(JobUpdate::JobUpdate(job));
    }

    /// Sends an update to all subscribers.
    pub fn send(&self, update: JobUpdate) {
        // No active receivers is fine
        let _ = self.sender.send(update);
    }

    /// Creates a new subscriber. Dropping it unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Creates a tracker that records mutations for one job.
    pub fn track(&self, job_id: &str, store: Arc<JobStore>) -> JobProgressTracker {
        JobProgressTracker::new(job_id, store, Arc::clone(&self.sender))
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Commits mutations for a single job and publishes the resulting snapshot.
pub struct JobProgressTracker {
    job_id: String,
    store: Arc<JobStore>,
    sender: Arc<broadcast::Sender<JobUpdate>>,
}

impl JobProgressTracker {
    pub fn new(job_id: &str, store: Arc<JobStore>, sender: Arc<broadcast::Sender<JobUpdate>>) -> Self {
        Self {
            job_id: job_id.to_string(),
            store,
            sender,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Applies the mutation to the store, then publishes the fresh snapshot.
    ///
    /// Nothing is published when the store rejects the mutation.
    pub fn record(&self, mutation: JobMutation) -> Result<Job, JobError> {
        let job = self.store.update(&self.job_id, mutation)?;
        let _ = self.sender.send(JobUpdate::JobUpdate(job.clone()));
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::job::JobStatus;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn store_with_job() -> (Arc<JobStore>, String) {
        let store = Arc::new(JobStore::new());
        let job_id = store.create("deck.pptx", 4).unwrap();
        (store, job_id)
    }

    #[test]
    fn test_broadcaster_creation() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let _rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let (store, job_id) = store_with_job();
        let broadcaster = JobProgressBroadcaster::default();
        broadcaster.publish(store.get(&job_id).unwrap());
    }

    #[test]
    fn test_publish_receive() {
        let (store, job_id) = store_with_job();
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        broadcaster.publish(store.get(&job_id).unwrap());

        let received = rx.try_recv().unwrap();
        assert_eq!(received.job().job_id, job_id);
        assert_eq!(received.job().status, JobStatus::Uploaded);
    }

    #[test]
    fn test_dropping_receiver_unsubscribes() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);
        drop(rx);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_update_wire_format() {
        let (store, job_id) = store_with_job();
        let update = JobUpdate::JobUpdate(store.get(&job_id).unwrap());
        let value = serde_json::to_value(&update).unwrap();

        assert_eq!(value["type"], "job_update");
        assert_eq!(value["data"]["job_id"], job_id.as_str());
        assert_eq!(value["data"]["status"], "uploaded");
    }

    #[test]
    fn test_tracker_records_then_publishes() {
        let (store, job_id) = store_with_job();
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();
        let tracker = broadcaster.track(&job_id, Arc::clone(&store));

        let job = tracker.record(JobMutation::Start).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(store.get(&job_id).unwrap().status, JobStatus::Processing);

        let received = rx.try_recv().unwrap();
        assert_eq!(received.into_job(), job);
    }

    #[test]
    fn test_rejected_mutation_publishes_nothing() {
        let (store, job_id) = store_with_job();
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();
        let tracker = broadcaster.track(&job_id, store);

        assert!(tracker.record(JobMutation::CompleteStep).is_err());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let (store, job_id) = store_with_job();
        let broadcaster = JobProgressBroadcaster::new(2);
        let mut rx = broadcaster.subscribe();
        let job = store.get(&job_id).unwrap();

        for _ in 0..5 {
            broadcaster.publish(job.clone());
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert!(rx.recv().await.is_ok());
        assert!(rx.recv().await.is_ok());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
