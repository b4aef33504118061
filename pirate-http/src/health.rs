//! `GET /health`: every worker exposes the same shape regardless of which
//! component it is, so a status page or alert rule never has to special
//! case "which kind of worker is this". Workers that have no concept of
//! an LLM provider (reconciler, recorder, publisher) report a fixed
//! provider name and `authenticated: true`.

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub provider: String,
    pub authenticated: bool,
    pub model: String,
}

/// Implemented once per worker kind; the LLM worker delegates to its
/// provider's `healthcheck()`, other workers return a static report.
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn health(&self) -> HealthReport;
}

pub struct StaticHealthSource(pub HealthReport);

#[async_trait]
impl HealthSource for StaticHealthSource {
    async fn health(&self) -> HealthReport {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: String,
    pub authenticated: bool,
    pub model: String,
    pub queue_depth: usize,
}
