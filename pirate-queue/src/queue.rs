use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::backend::QueueBackend;
use crate::error::QueueResult;
use crate::messages::{AlignedJob, JobPayload, RawJob, RecorderJob};
use crate::retry::BackoffPolicy;
use crate::types::{JobId, JobRecord, JobStatus, LeaseToken, LeasedJob};

/// The pipeline's public queue handle. Thin wrapper over a
/// [`QueueBackend`]: all it adds on top is the default backoff policy for
/// `defer_with_backoff` and a little structured logging, matching how the
/// rest of the pipeline only ever talks to a queue through this type, never
/// a concrete backend.
#[derive(Clone)]
pub struct PirateQueue {
    backend: Arc<dyn QueueBackend>,
    backoff: BackoffPolicy,
}

impl PirateQueue {
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self { backend, backoff: BackoffPolicy::default() }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn enqueue_raw(&self, job: RawJob, max_retries: u32) -> QueueResult<JobId> {
        self.enqueue(JobPayload::Raw(job), max_retries).await
    }

    pub async fn enqueue_aligned(&self, job: AlignedJob, max_retries: u32) -> QueueResult<JobId> {
        self.enqueue(JobPayload::Aligned(job), max_retries).await
    }

    pub async fn enqueue_recorder(&self, job: RecorderJob, max_retries: u32) -> QueueResult<JobId> {
        self.enqueue(JobPayload::Recorder(job), max_retries).await
    }

    async fn enqueue(&self, payload: JobPayload, max_retries: u32) -> QueueResult<JobId> {
        let job_id = JobId::new();
        let queue = payload.queue_name();
        self.backend.enqueue(job_id.clone(), payload, max_retries).await?;
        info!(job_id = %job_id, queue, "job enqueued");
        Ok(job_id)
    }

    pub async fn reserve(&self, queue: &str, lease_for: Duration) -> QueueResult<Option<LeasedJob>> {
        self.backend.reserve(queue, lease_for).await
    }

    pub async fn complete(&self, job_id: &JobId, lease_token: &LeaseToken) -> QueueResult<()> {
        self.backend.complete(job_id, lease_token).await
    }

    pub async fn fail(&self, job_id: &JobId, lease_token: &LeaseToken, error: impl Into<String>) -> QueueResult<()> {
        let error = error.into();
        warn!(job_id = %job_id, %error, "job dead-lettered");
        self.backend.fail(job_id, lease_token, error).await
    }

    pub async fn defer(&self, job_id: &JobId, lease_token: &LeaseToken, retry_at: DateTime<Utc>, error: impl Into<String>) -> QueueResult<()> {
        self.backend.defer(job_id, lease_token, retry_at, error.into()).await
    }

    /// Defer a leased job using this queue's default backoff-with-jitter
    /// schedule, keyed off the job's current attempt count.
    pub async fn defer_with_backoff(&self, leased: &LeasedJob, error: impl Into<String>) -> QueueResult<()> {
        let delay = self.backoff.delay_for_attempt(leased.record.attempt);
        let retry_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
        self.defer(leased.job_id(), &leased.lease_token, retry_at, error).await
    }

    pub async fn length(&self, queue: &str) -> QueueResult<usize> {
        self.backend.length(queue).await
    }

    pub async fn dead_letter_drain(&self, queue: &str, limit: usize) -> QueueResult<Vec<JobRecord>> {
        self.backend.dead_letter_drain(queue, limit).await
    }

    pub async fn status(&self, job_id: &JobId) -> QueueResult<JobStatus> {
        self.backend.get_status(job_id).await
    }
}
