pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::QueueResult;
use crate::messages::JobPayload;
use crate::types::{JobId, JobRecord, JobStatus, LeaseToken, LeasedJob, QueueCapabilities};

/// Storage primitive a [`crate::PirateQueue`] is built on. Every method
/// here is the literal operation the pipeline's queue substrate is
/// specified by: `enqueue`, `reserve`, `complete`, `fail`, `defer`,
/// `length`, `dead_letter_drain`.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Push a new job onto the queue its payload variant names.
    async fn enqueue(&self, job_id: JobId, payload: JobPayload, max_retries: u32) -> QueueResult<()>;

    /// Reserve the oldest eligible job on `queue` (FIFO within a queue),
    /// granting exclusive ownership for `lease_for`. Returns `None` if no
    /// job is currently eligible.
    async fn reserve(&self, queue: &str, lease_for: std::time::Duration) -> QueueResult<Option<LeasedJob>>;

    /// Mark a leased job complete. Fails with `InvalidLeaseToken` if the
    /// token doesn't match the job's current lease (it may have expired
    /// and been reassigned already).
    async fn complete(&self, job_id: &JobId, lease_token: &LeaseToken) -> QueueResult<()>;

    /// Permanently fail a leased job, moving it to the dead-letter list.
    async fn fail(&self, job_id: &JobId, lease_token: &LeaseToken, error: String) -> QueueResult<()>;

    /// Release a leased job back to the queue, retryable at `retry_at`.
    async fn defer(&self, job_id: &JobId, lease_token: &LeaseToken, retry_at: DateTime<Utc>, error: String) -> QueueResult<()>;

    /// Count of jobs currently eligible or in-flight on `queue` (excludes
    /// terminal jobs).
    async fn length(&self, queue: &str) -> QueueResult<usize>;

    /// Drain up to `limit` dead-lettered records, oldest first, removing
    /// them from the dead-letter list.
    async fn dead_letter_drain(&self, queue: &str, limit: usize) -> QueueResult<Vec<JobRecord>>;

    async fn get_status(&self, job_id: &JobId) -> QueueResult<JobStatus>;

    fn capabilities(&self) -> QueueCapabilities;
}
