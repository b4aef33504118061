//! The health and metrics HTTP surface every long-running pipeline worker
//! mounts: `GET /health` (liveness, provider auth state, queue depth) and
//! `GET /metrics` (Prometheus exposition). Workers differ only in which
//! [`health::HealthSource`] they plug in and which queue's depth they
//! report.

pub mod app;
pub mod error;
pub mod health;
pub mod metrics;
pub mod state;

pub use app::{build_router, serve};
pub use error::PirateHttpError;
pub use health::{HealthReport, HealthResponse, HealthSource, StaticHealthSource};
pub use metrics::PipelineMetrics;
pub use state::AppState;
