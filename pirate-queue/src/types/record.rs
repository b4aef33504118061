use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::messages::JobPayload;

use super::{JobId, LeaseToken};

/// A job's lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobStatus {
    Enqueued,
    Processing { lease_until: DateTime<Utc> },
    Retrying { retry_at: DateTime<Utc> },
    Completed { completed_at: DateTime<Utc> },
    /// Exhausted retries (or hit a non-retryable error) and was moved to
    /// the dead-letter list.
    DeadLettered { failed_at: DateTime<Utc>, error: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::DeadLettered { .. })
    }

    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Enqueued => true,
            Self::Retrying { retry_at } => *retry_at <= now,
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Processing { .. } => "processing",
            Self::Retrying { .. } => "retrying",
            Self::Completed { .. } => "completed",
            Self::DeadLettered { .. } => "dead_lettered",
        }
    }
}

/// Mutable runtime state for a single job, as stored by a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub queue: String,
    pub payload: JobPayload,
    pub status: JobStatus,
    pub attempt: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub lease_token: Option<LeaseToken>,
    pub lease_until: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(job_id: JobId, payload: JobPayload, max_retries: u32) -> Self {
        let now = Utc::now();
        Self {
            queue: payload.queue_name().to_string(),
            job_id,
            payload,
            status: JobStatus::Enqueued,
            attempt: 0,
            max_retries,
            created_at: now,
            updated_at: now,
            last_error: None,
            lease_token: None,
            lease_until: None,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_retries && !self.status.is_terminal()
    }

    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(
            (&self.status, self.lease_until),
            (JobStatus::Processing { .. }, Some(lease_until)) if lease_until < now
        )
    }

    pub fn start_processing(&mut self, lease_token: LeaseToken, lease_until: DateTime<Utc>) {
        self.status = JobStatus::Processing { lease_until };
        self.lease_token = Some(lease_token);
        self.lease_until = Some(lease_until);
        self.updated_at = Utc::now();
    }

    pub fn complete(&mut self) {
        self.status = JobStatus::Completed { completed_at: Utc::now() };
        self.lease_token = None;
        self.lease_until = None;
        self.updated_at = Utc::now();
    }

    pub fn dead_letter(&mut self, error: String) {
        self.status = JobStatus::DeadLettered { failed_at: Utc::now(), error: error.clone() };
        self.last_error = Some(error);
        self.lease_token = None;
        self.lease_until = None;
        self.updated_at = Utc::now();
    }

    pub fn schedule_retry(&mut self, retry_at: DateTime<Utc>, error: String) {
        self.status = JobStatus::Retrying { retry_at };
        self.attempt += 1;
        self.last_error = Some(error);
        self.lease_token = None;
        self.lease_until = None;
        self.updated_at = Utc::now();
    }
}

/// A job handed out by `reserve`, with the lease token the worker must
/// present back to `complete`/`fail`/`defer`.
#[derive(Debug, Clone)]
pub struct LeasedJob {
    pub record: JobRecord,
    pub lease_token: LeaseToken,
    pub lease_until: DateTime<Utc>,
}

impl LeasedJob {
    pub fn job_id(&self) -> &JobId {
        &self.record.job_id
    }

    pub fn payload(&self) -> &JobPayload {
        &self.record.payload
    }

    pub fn lease_valid(&self, now: DateTime<Utc>) -> bool {
        self.lease_until > now
    }
}
