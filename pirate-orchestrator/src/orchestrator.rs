//! Ties scraper discovery, the per-scraper subprocess runner and the
//! concurrency/timeout bounds together, then hands each successful scrape
//! to the `raw` queue. One failing scraper never blocks or poisons the
//! others: `run_all` collects a result per scraper instead of
//! short-circuiting on the first error.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pirate_core::NamedRegistry;
use pirate_queue::{JobId, PirateQueue, RawJob};
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::runner::{run_scraper, ScrapeOutput};
use crate::scraper::{discover_scrapers, ScraperSpec};

pub struct Orchestrator {
    registry: NamedRegistry<ScraperSpec>,
    queue: PirateQueue,
    concurrency: Arc<Semaphore>,
    max_retries: u32,
}

impl Orchestrator {
    /// Discover scrapers under `config.scrapers_dir` and build a registry
    /// keyed by scraper name.
    pub fn discover(config: &OrchestratorConfig, queue: PirateQueue) -> std::io::Result<Self> {
        let mut registry = NamedRegistry::new();
        for spec in discover_scrapers(&config.scrapers_dir, config.scraper_timeout)? {
            registry.register(spec.name.clone(), Arc::new(spec));
        }
        Ok(Self { registry, queue, concurrency: Arc::new(Semaphore::new(config.concurrency.max(1))), max_retries: config.max_retries })
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names = self.registry.names();
        names.sort_unstable();
        names
    }

    /// Run one scraper and enqueue its output onto `raw`. Returns the
    /// enqueued job id.
    pub async fn run_one(&self, name: &str) -> OrchestratorResult<JobId> {
        let output = self.scrape(name).await?;
        let job = RawJob {
            scraper_name: name.to_string(),
            source_id: Uuid::new_v4().to_string(),
            raw_content: output.raw_content,
            content_hash: output.content_hash,
            scraped_at: Utc::now(),
        };
        self.queue
            .enqueue_raw(job, self.max_retries)
            .await
            .map_err(|e| OrchestratorError::Io(std::io::Error::other(e.to_string())))
    }

    /// Run a scraper and report its output without enqueueing anything —
    /// the orchestration CLI's `test <name>` dry-run.
    pub async fn test_one(&self, name: &str) -> OrchestratorResult<ScrapeOutput> {
        self.scrape(name).await
    }

    async fn scrape(&self, name: &str) -> OrchestratorResult<ScrapeOutput> {
        let spec = self.registry.get(name).ok_or_else(|| OrchestratorError::ScraperNotFound(name.to_string()))?;
        let _permit = self.concurrency.acquire().await.expect("semaphore is never closed");
        run_scraper(&spec).await
    }

    /// Run every registered scraper, bounded by the configured concurrency
    /// cap. A failing scraper is logged and reflected in its own result
    /// slot; it never prevents the others from running.
    pub async fn run_all(&self) -> Vec<(String, OrchestratorResult<JobId>)> {
        let names: Vec<String> = self.list().into_iter().map(str::to_string).collect();
        let mut handles = Vec::with_capacity(names.len());

        for name in names {
            let permit = self.concurrency.clone().acquire_owned().await.expect("semaphore is never closed");
            let spec = match self.registry.get(&name) {
                Some(spec) => spec,
                None => continue,
            };
            let queue = self.queue.clone();
            let max_retries = self.max_retries;
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = match run_scraper(&spec).await {
                    Ok(output) => {
                        let job = RawJob {
                            scraper_name: name.clone(),
                            source_id: Uuid::new_v4().to_string(),
                            raw_content: output.raw_content,
                            content_hash: output.content_hash,
                            scraped_at: Utc::now(),
                        };
                        queue.enqueue_raw(job, max_retries).await.map_err(|e| OrchestratorError::Io(std::io::Error::other(e.to_string())))
                    }
                    Err(e) => Err(e),
                };
                if let Err(ref e) = result {
                    error!(scraper = %name, error = %e, "scraper run failed");
                }
                (name, result)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(pair) => results.push(pair),
                Err(join_err) => {
                    error!(error = %join_err, "scraper task panicked");
                }
            }
        }
        results
    }

    pub async fn run_forever(self: Arc<Self>, schedule: cron::Schedule) {
        loop {
            let next = match schedule.upcoming(Utc).next() {
                Some(next) => next,
                None => return,
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::from_secs(0));
            tokio::time::sleep(wait).await;

            info!("scheduled tick firing");
            let results = self.run_all().await;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
            info!(scrapers = results.len(), failed, "scheduled tick complete");
        }
    }
}
