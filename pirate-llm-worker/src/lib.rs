//! # pirate-llm-worker
//!
//! Consumes the `raw` queue and produces validated HSDS candidates on the
//! `aligned` queue (mirrored to `recorder`). Dedup by content hash short-
//! circuits the provider call entirely; a validation retry loop feeds the
//! confidence validator's feedback text back into the prompt until
//! `min_confidence` is hit or `max_retries` is exhausted; failures are
//! routed back onto the queue per the provider-specific retry schedules in
//! [`retry_schedule`].

pub mod config;
pub mod outcome;
pub mod prompt;
pub mod provider;
pub mod retry_schedule;
pub mod testing;
pub mod worker;

pub use config::AlignmentConfig;
pub use outcome::AlignmentOutcome;
pub use provider::{GenerateRequest, GenerateResponse, HealthStatus, LlmProvider, ProviderError};
pub use worker::AlignmentWorker;
