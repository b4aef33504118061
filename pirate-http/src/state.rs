use std::sync::Arc;

use pirate_queue::PirateQueue;

use crate::health::HealthSource;
use crate::metrics::PipelineMetrics;

#[derive(Clone)]
pub struct AppState {
    pub health_source: Arc<dyn HealthSource>,
    pub queue: PirateQueue,
    /// Which queue's depth to report at `/health` — `raw` for the
    /// orchestrator and LLM worker, `aligned` for the reconciler, etc.
    pub health_queue: String,
    pub metrics: Arc<PipelineMetrics>,
}

impl AppState {
    pub fn new(health_source: Arc<dyn HealthSource>, queue: PirateQueue, health_queue: impl Into<String>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { health_source, queue, health_queue: health_queue.into(), metrics }
    }
}
