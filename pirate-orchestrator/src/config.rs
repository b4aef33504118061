use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cron::Schedule;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub scrapers_dir: PathBuf,
    pub schedule: Schedule,
    pub concurrency: usize,
    pub scraper_timeout: Duration,
    pub max_retries: u32,
}

impl OrchestratorConfig {
    pub fn new(scrapers_dir: impl Into<PathBuf>) -> Self {
        Self {
            scrapers_dir: scrapers_dir.into(),
            schedule: default_schedule(),
            concurrency: 5,
            scraper_timeout: Duration::from_secs(3600),
            max_retries: 3,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_scraper_timeout(mut self, timeout: Duration) -> Self {
        self.scraper_timeout = timeout;
        self
    }

    /// `expr` is a standard 5-field unix cron expression (minute hour
    /// day-of-month month day-of-week); the `cron` crate's own syntax
    /// additionally wants a leading seconds field, so it's synthesized
    /// here as `0`.
    pub fn with_schedule(mut self, expr: &str) -> Result<Self, cron::error::Error> {
        self.schedule = parse_five_field_schedule(expr)?;
        Ok(self)
    }
}

/// The documented default: every 4 hours, on the hour.
fn default_schedule() -> Schedule {
    parse_five_field_schedule("0 */4 * * *").expect("default schedule is valid cron syntax")
}

fn parse_five_field_schedule(expr: &str) -> Result<Schedule, cron::error::Error> {
    Schedule::from_str(&format!("0 {expr}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_the_every_four_hours_schedule() {
        let config = OrchestratorConfig::new("/tmp/scrapers");
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.scraper_timeout, Duration::from_secs(3600));
        assert!(config.schedule.upcoming(chrono::Utc).next().is_some());
    }
}
