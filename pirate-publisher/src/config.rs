use std::path::PathBuf;
use std::time::Duration;

use pirate_core::PirateConfig;

use crate::ratchet::RatchetConfig;

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub interval: Duration,
    pub external_repo_root: PathBuf,
    pub recorder_output_root: PathBuf,
    pub content_store_root: PathBuf,
    pub database_url: String,
    /// Gates the final `git push`. Defaults to `false` (read-only) so a
    /// fresh deployment never pushes by accident.
    pub push_enabled: bool,
    pub days_to_sync: i64,
    pub ratchet: RatchetConfig,
    pub remote: String,
    pub main_branch: String,
}

impl PublisherConfig {
    pub fn new(external_repo_root: impl Into<PathBuf>, recorder_output_root: impl Into<PathBuf>, content_store_root: impl Into<PathBuf>, database_url: impl Into<String>) -> Self {
        Self {
            interval: Duration::from_secs(300),
            external_repo_root: external_repo_root.into(),
            recorder_output_root: recorder_output_root.into(),
            content_store_root: content_store_root.into(),
            database_url: database_url.into(),
            push_enabled: false,
            days_to_sync: 7,
            ratchet: RatchetConfig::default(),
            remote: "origin".to_string(),
            main_branch: "main".to_string(),
        }
    }

    /// Build from the pipeline-wide environment config plus the three
    /// filesystem roots that don't have dedicated environment keys.
    pub fn from_pirate_config(cfg: &PirateConfig, external_repo_root: impl Into<PathBuf>, recorder_output_root: impl Into<PathBuf>, content_store_root: impl Into<PathBuf>) -> Self {
        Self {
            interval: cfg.publisher_check_interval,
            external_repo_root: external_repo_root.into(),
            recorder_output_root: recorder_output_root.into(),
            content_store_root: content_store_root.into(),
            database_url: cfg.database_url.clone(),
            push_enabled: cfg.publisher_push_enabled,
            days_to_sync: cfg.days_to_sync,
            ratchet: RatchetConfig {
                ratchet_pct: cfg.sql_dump_ratchet_percentage,
                min_records: cfg.sql_dump_min_records,
                allow_empty: cfg.allow_empty_sql_dump,
            },
            remote: "origin".to_string(),
            main_branch: "main".to_string(),
        }
    }

    pub fn with_push_enabled(mut self, enabled: bool) -> Self {
        self.push_enabled = enabled;
        self
    }
}
