use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JobId;

/// A stable, structured event every backend emits for observability. Not
/// used for correctness — `JobRecord` is the source of truth — only for
/// dashboards and the health endpoint's recent-activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobEvent {
    Enqueued { job_id: JobId, queue: String, at: DateTime<Utc> },
    Leased { job_id: JobId, lease_until: DateTime<Utc>, at: DateTime<Utc> },
    Retrying { job_id: JobId, retry_at: DateTime<Utc>, error: String, at: DateTime<Utc> },
    Completed { job_id: JobId, at: DateTime<Utc> },
    DeadLettered { job_id: JobId, error: String, at: DateTime<Utc> },
}

impl JobEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Enqueued { .. } => "enqueued",
            Self::Leased { .. } => "leased",
            Self::Retrying { .. } => "retrying",
            Self::Completed { .. } => "completed",
            Self::DeadLettered { .. } => "dead_lettered",
        }
    }

    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Enqueued { job_id, .. }
            | Self::Leased { job_id, .. }
            | Self::Retrying { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::DeadLettered { job_id, .. } => job_id,
        }
    }
}
