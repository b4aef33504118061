use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `.publisher_state.json`: the set of recorder files already synced, plus
/// the timestamp of the last successful tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublisherState {
    #[serde(default)]
    pub processed_files: BTreeSet<String>,
    pub last_run_at: Option<DateTime<Utc>>,
}

impl PublisherState {
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

    pub fn mark_processed(&mut self, relative_path: impl Into<String>) {
        self.processed_files.insert(relative_path.into());
    }

    pub fn is_processed(&self, relative_path: &str) -> bool {
        self.processed_files.contains(relative_path)
    }
}

pub fn state_path(recorder_output_root: &Path) -> PathBuf {
    recorder_output_root.join(".publisher_state.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".publisher_state.json");

        let mut state = PublisherState::default();
        state.mark_processed("daily/2026-08-01/scrapers/x/a.json");
        state.save(&path).await.unwrap();

        let loaded = PublisherState::load(&path).await.unwrap();
        assert!(loaded.is_processed("daily/2026-08-01/scrapers/x/a.json"));
    }

    #[tokio::test]
    async fn missing_state_file_loads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = PublisherState::load(&dir.path().join("missing.json")).await.unwrap();
        assert!(state.processed_files.is_empty());
    }
}
