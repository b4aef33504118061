//! The pipeline's Prometheus registry: counters for jobs by queue×status,
//! reconciler matches by type and record-versions by record type,
//! histograms for provider and job-processing latency, gauges for queue
//! depth, active workers and memory. Every long-running component shares
//! one [`PipelineMetrics`] instance and renders it at `GET /metrics`.

use prometheus::{
    CounterVec, Encoder, Gauge, GaugeVec, HistogramVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct PipelineMetrics {
    registry: Registry,
    pub jobs_processed: CounterVec,
    pub reconciler_matches: CounterVec,
    pub record_versions: CounterVec,
    pub provider_latency_seconds: HistogramVec,
    pub job_processing_latency_seconds: HistogramVec,
    pub queue_depth: GaugeVec,
    pub active_workers: Gauge,
    pub memory_bytes: Gauge,
}

impl PipelineMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let jobs_processed = CounterVec::new(
            Opts::new("jobs_processed", "Jobs processed, labeled by queue, terminal status and cache hit"),
            &["queue", "status", "cached"],
        )?;
        let reconciler_matches = CounterVec::new(
            Opts::new("reconciler_matches", "Reconciler entity matches, labeled by match type"),
            &["match_type"],
        )?;
        let record_versions = CounterVec::new(
            Opts::new("record_versions", "record_version rows written, labeled by record type"),
            &["record_type"],
        )?;
        let provider_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("provider_latency_seconds", "LLM provider call latency"),
            &["provider"],
        )?;
        let job_processing_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("job_processing_latency_seconds", "End-to-end job processing latency"),
            &["queue"],
        )?;
        let queue_depth = GaugeVec::new(Opts::new("queue_depth", "Pending job count per queue"), &["queue"])?;
        let active_workers = Gauge::new("active_workers", "Worker processes currently reporting health")?;
        let memory_bytes = Gauge::new("memory_bytes", "Resident memory of the reporting process")?;

        for collector in [
            Box::new(jobs_processed.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(reconciler_matches.clone()),
            Box::new(record_versions.clone()),
            Box::new(provider_latency_seconds.clone()),
            Box::new(job_processing_latency_seconds.clone()),
            Box::new(queue_depth.clone()),
            Box::new(active_workers.clone()),
            Box::new(memory_bytes.clone()),
        ] {
            registry.register(collector)?;
        }

        Ok(Self {
            registry,
            jobs_processed,
            reconciler_matches,
            record_versions,
            provider_latency_seconds,
            job_processing_latency_seconds,
            queue_depth,
            active_workers,
            memory_bytes,
        })
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_counters_show_up_in_the_rendered_output() {
        let metrics = PipelineMetrics::new().unwrap();
        metrics.jobs_processed.with_label_values(&["raw", "completed", "true"]).inc();
        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("jobs_processed"));
        assert!(rendered.contains(r#"queue="raw""#));
    }
}
