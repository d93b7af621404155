pub mod job;
pub mod pool;

pub use job::{Job, JobMutation, JobStatus};
pub use pool::JobRunner;
