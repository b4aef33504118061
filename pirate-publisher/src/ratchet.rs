//! `sql_dumps/.record_count_ratchet`: a safety floor on the canonical
//! `location` row count that must hold before a SQL dump is written, so a
//! botched reconcile run (or an empty database) can never overwrite a good
//! dump with a near-empty one.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct RatchetConfig {
    pub ratchet_pct: f64,
    pub min_records: i64,
    /// `ALLOW_EMPTY_SQL_DUMP`: bypasses the ratchet entirely. Meant for a
    /// first-run `DB_INIT` pass against an intentionally empty database.
    pub allow_empty: bool,
}

impl Default for RatchetConfig {
    fn default() -> Self {
        Self { ratchet_pct: 0.9, min_records: 100, allow_empty: false }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ratchet {
    pub max_record_count: i64,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl Ratchet {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(self)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// `count < max(max_record_count * ratchet_pct, min_records)` trips the
    /// ratchet: the dump and commit for this tick are both skipped. Always
    /// `false` when `allow_empty` is set.
    pub fn trips(&self, count: i64, config: RatchetConfig) -> bool {
        if config.allow_empty {
            return false;
        }
        let floor = (self.max_record_count as f64 * config.ratchet_pct).max(config.min_records as f64);
        (count as f64) < floor
    }

    /// Raise the ratchet after a dump that grew the table, never lower it.
    pub fn advance(&mut self, count: i64, updated_by: &str) {
        if count > self.max_record_count {
            self.max_record_count = count;
            self.updated_at = Some(Utc::now());
            self.updated_by = Some(updated_by.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratchet_trips_below_the_percentage_floor() {
        let ratchet = Ratchet { max_record_count: 1000, updated_at: None, updated_by: None };
        assert!(ratchet.trips(899, RatchetConfig::default()));
        assert!(!ratchet.trips(900, RatchetConfig::default()));
    }

    #[test]
    fn ratchet_uses_min_records_floor_when_larger() {
        let ratchet = Ratchet { max_record_count: 50, updated_at: None, updated_by: None };
        assert!(ratchet.trips(99, RatchetConfig::default()));
        assert!(!ratchet.trips(100, RatchetConfig::default()));
    }

    #[test]
    fn allow_empty_bypasses_the_ratchet() {
        let ratchet = Ratchet { max_record_count: 1000, updated_at: None, updated_by: None };
        let config = RatchetConfig { allow_empty: true, ..RatchetConfig::default() };
        assert!(!ratchet.trips(0, config));
    }

    #[test]
    fn advance_never_lowers_the_watermark() {
        let mut ratchet = Ratchet { max_record_count: 1000, updated_at: None, updated_by: None };
        ratchet.advance(500, "publisher");
        assert_eq!(ratchet.max_record_count, 1000);
        ratchet.advance(1200, "publisher");
        assert_eq!(ratchet.max_record_count, 1200);
        assert_eq!(ratchet.updated_by.as_deref(), Some("publisher"));
    }
}
