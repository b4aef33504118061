//! # pirate-queue
//!
//! The job queue substrate the rest of the Pantry Pirate Radio pipeline is
//! built on: three named FIFO queues (`raw`, `aligned`, `recorder`),
//! lease-based exclusive reservation, at-least-once delivery, and a
//! dead-letter list per queue for jobs that exhaust their retries.
//!
//! A memory backend (`memory` feature, on by default) backs tests and
//! single-box development; a Redis backend (`redis` feature, on by
//! default) is what production runs against.

pub mod backend;
pub mod error;
pub mod messages;
pub mod queue;
pub mod retry;
pub mod types;

pub use backend::memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use backend::redis::RedisBackend;
pub use backend::QueueBackend;
pub use error::{QueueError, QueueResult};
pub use messages::{AlignedJob, JobPayload, RawJob, RecorderJob};
pub use queue::PirateQueue;
pub use retry::BackoffPolicy;
pub use types::{JobEvent, JobId, JobRecord, JobStatus, LeasedJob, LeaseToken, QueueCapabilities};
