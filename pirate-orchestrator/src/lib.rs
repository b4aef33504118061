//! Discovers scraper subprocesses by filesystem convention, runs them on a
//! schedule (default every 4 hours) under a concurrency cap and per-scraper
//! timeout, and feeds their hashed output onto the `raw` queue. A failing
//! scraper is isolated: it neither blocks its siblings nor poisons the
//! queue it would have enqueued to.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod runner;
pub mod scraper;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::Orchestrator;
pub use runner::ScrapeOutput;
pub use scraper::{discover_scrapers, ScraperSpec};
