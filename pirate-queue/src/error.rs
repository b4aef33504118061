use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure-level queue failures. A job's own `ValidationError` or
/// `QuotaExceeded` etc. is reported through `pirate_core::ErrorKind` at the
/// worker layer instead — this enum is only for the queue substrate itself
/// misbehaving (bad lease, backend unreachable, corrupt record).
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("lease token does not match the job's current lease")]
    InvalidLeaseToken,

    #[error("lease has expired")]
    LeaseExpired,

    #[error("job is already in a terminal state")]
    JobAlreadyTerminal,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}
