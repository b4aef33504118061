//! Filesystem writer for the dated output tree. Every write goes
//! temp-file-then-rename, the same atomicity pattern the content store
//! uses for its shard files, so a reader never observes a partially
//! written job or summary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::RecorderConfig;
use crate::error::RecorderResult;
use crate::summary::DailySummary;

#[async_trait]
pub trait RecordWriter: Send + Sync {
    async fn write_job(&self, date: &str, scraper_id: &str, job_id: Uuid, record: &Value) -> RecorderResult<PathBuf>;
    async fn update_summary(&self, date: &str, scraper_id: &str, job_id: Uuid, recorded_at: DateTime<Utc>) -> RecorderResult<()>;
    async fn update_latest_pointer(&self, scraper_id: &str, record: &Value) -> RecorderResult<()>;
}

pub struct FsRecordWriter {
    config: RecorderConfig,
}

impl FsRecordWriter {
    pub fn new(config: RecorderConfig) -> Self {
        Self { config }
    }

    fn daily_dir(&self, date: &str) -> PathBuf {
        self.config.root.join("daily").join(date)
    }

    fn latest_dir(&self) -> PathBuf {
        self.config.root.join("latest")
    }
}

/// Write `bytes` to `path` via a sibling `.tmp` file and an atomic rename,
/// creating any missing parent directories first.
async fn atomic_write(path: &Path, bytes: &[u8]) -> RecorderResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension(format!("{}.tmp", path.extension().and_then(|e| e.to_str()).unwrap_or("tmp")));
    tokio::fs::write(&tmp_path, bytes).await?;
    match tokio::fs::rename(&tmp_path, path).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            Err(e.into())
        }
    }
}

async fn read_json_or_default<T: Default + serde::de::DeserializeOwned>(path: &Path) -> RecorderResult<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RecordWriter for FsRecordWriter {
    async fn write_job(&self, date: &str, scraper_id: &str, job_id: Uuid, record: &Value) -> RecorderResult<PathBuf> {
        let path = self.daily_dir(date).join("scrapers").join(scraper_id).join(format!("{job_id}.json"));
        atomic_write(&path, &serde_json::to_vec_pretty(record)?).await?;
        debug!(path = %path.display(), "recorder wrote job output");
        Ok(path)
    }

    async fn update_summary(&self, date: &str, scraper_id: &str, job_id: Uuid, recorded_at: DateTime<Utc>) -> RecorderResult<()> {
        let path = self.daily_dir(date).join("summary.json");
        let mut summary: DailySummary = read_json_or_default(&path).await?;
        if summary.date.is_empty() {
            summary.date = date.to_string();
        }
        summary.record(job_id, scraper_id, recorded_at);
        atomic_write(&path, &serde_json::to_vec_pretty(&summary)?).await
    }

    async fn update_latest_pointer(&self, scraper_id: &str, record: &Value) -> RecorderResult<()> {
        let path = self.latest_dir().join(format!("{scraper_id}_latest.json"));
        atomic_write(&path, &serde_json::to_vec_pretty(record)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn writer() -> (FsRecordWriter, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (FsRecordWriter::new(RecorderConfig::new(dir.path())), dir)
    }

    #[tokio::test]
    async fn write_job_creates_file_under_scraper_dir() {
        let (writer, dir) = writer();
        let job_id = Uuid::new_v4();
        let path = writer.write_job("2026-08-01", "food_bank_x", job_id, &json!({"ok": true})).await.unwrap();

        assert!(path.starts_with(dir.path().join("daily/2026-08-01/scrapers/food_bank_x")));
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("\"ok\""));
    }

    #[tokio::test]
    async fn summary_accumulates_counts_across_calls() {
        let (writer, dir) = writer();
        writer.update_summary("2026-08-01", "food_bank_x", Uuid::new_v4(), Utc::now()).await.unwrap();
        writer.update_summary("2026-08-01", "food_bank_x", Uuid::new_v4(), Utc::now()).await.unwrap();

        let path = dir.path().join("daily/2026-08-01/summary.json");
        let summary: DailySummary = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(summary.jobs.len(), 2);
        assert_eq!(summary.counts_by_scraper["food_bank_x"], 2);
    }

    #[tokio::test]
    async fn latest_pointer_is_overwritten_not_appended() {
        let (writer, dir) = writer();
        writer.update_latest_pointer("food_bank_x", &json!({"v": 1})).await.unwrap();
        writer.update_latest_pointer("food_bank_x", &json!({"v": 2})).await.unwrap();

        let path = dir.path().join("latest/food_bank_x_latest.json");
        let value: Value = serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(value["v"], 2);
    }
}
