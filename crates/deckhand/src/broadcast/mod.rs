//! Job state and real-time update fan-out.
//!
//! The store holds the authoritative job records; the broadcaster pushes
//! every committed snapshot to live subscribers.

pub mod job_progress;
pub mod job_store;

pub use job_progress::{JobProgressBroadcaster, JobProgressTracker, JobUpdate};
pub use job_store::{JobCounts, JobStore};
