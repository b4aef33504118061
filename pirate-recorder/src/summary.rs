use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One day's index of recorded jobs: `outputs/daily/<date>/summary.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: String,
    #[serde(default)]
    pub jobs: Vec<JobSummaryEntry>,
    #[serde(default)]
    pub counts_by_scraper: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummaryEntry {
    pub job_id: Uuid,
    pub scraper_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl DailySummary {
    pub fn new(date: String) -> Self {
        Self { date, jobs: Vec::new(), counts_by_scraper: BTreeMap::new() }
    }

    pub fn record(&mut self, job_id: Uuid, scraper_id: &str, recorded_at: DateTime<Utc>) {
        self.jobs.push(JobSummaryEntry { job_id, scraper_id: scraper_id.to_string(), recorded_at });
        *self.counts_by_scraper.entry(scraper_id.to_string()).or_insert(0) += 1;
    }
}
