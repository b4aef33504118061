//! Write-once, content-addressed deduplication cache. Every LLM alignment
//! result is stored once under its SHA-256 content hash; a second `put` of
//! the same hash is a no-op that returns the first writer's record, never
//! a second file or a torn write.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ContentStoreConfig;
use crate::error::{ContentStoreError, ContentStoreResult};

/// A cached alignment result, keyed by content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub content_hash: String,
    pub first_job_id: Uuid,
    pub result_text: String,
    pub stored_at: DateTime<Utc>,
}

/// Aggregate counts for the health/metrics surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContentStoreStats {
    pub entry_count: usize,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Write-once: if `hash` already has a record, this is a no-op and the
    /// existing record is returned unchanged.
    async fn put(&self, hash: &str, text: &str, job_id: Uuid) -> ContentStoreResult<ContentRecord>;

    async fn get(&self, hash: &str) -> ContentStoreResult<Option<ContentRecord>>;

    async fn stats(&self) -> ContentStoreResult<ContentStoreStats>;
}

/// Filesystem-backed [`ContentStore`]: one JSON file per hash at
/// `<root>/<aa>/<bb>/<hash>.json`, plus an in-memory index kept for fast
/// `get`/`stats` that is rebuilt from disk on startup (never treated as
/// authoritative — the files are).
pub struct FsContentStore {
    root: PathBuf,
    index: Arc<Mutex<HashMap<String, ContentRecord>>>,
}

impl FsContentStore {
    /// Open (creating if necessary) a store at `config.root`, rebuilding
    /// the index by walking every `<aa>/<bb>/<hash>.json` file underneath
    /// it.
    pub async fn open(config: ContentStoreConfig) -> ContentStoreResult<Self> {
        tokio::fs::create_dir_all(&config.root).await?;
        let index = Self::rebuild_index(&config.root).await?;

        Ok(Self { root: config.root, index: Arc::new(Mutex::new(index)) })
    }

    async fn rebuild_index(root: &Path) -> ContentStoreResult<HashMap<String, ContentRecord>> {
        let mut index = HashMap::new();
        let mut shard_a = match tokio::fs::read_dir(root).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(index),
            Err(e) => return Err(e.into()),
        };

        while let Some(a_entry) = shard_a.next_entry().await? {
            if !a_entry.file_type().await?.is_dir() {
                continue;
            }
            let mut shard_b = tokio::fs::read_dir(a_entry.path()).await?;
            while let Some(b_entry) = shard_b.next_entry().await? {
                if !b_entry.file_type().await?.is_dir() {
                    continue;
                }
                let mut files = tokio::fs::read_dir(b_entry.path()).await?;
                while let Some(file) = files.next_entry().await? {
                    let path = file.path();
                    if path.extension().and_then(|e| e.to_str()) != Some("json") {
                        continue;
                    }
                    match load_record(&path).await {
                        Ok(record) => {
                            index.insert(record.content_hash.clone(), record);
                        }
                        Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable content record"),
                    }
                }
            }
        }

        debug!(entries = index.len(), "content store index rebuilt");
        Ok(index)
    }

    fn shard_path(&self, hash: &str) -> ContentStoreResult<PathBuf> {
        if hash.len() < 4 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ContentStoreError::MalformedHash(hash.to_string()));
        }
        Ok(self.root.join(&hash[0..2]).join(&hash[2..4]).join(format!("{hash}.json")))
    }
}

async fn load_record(path: &Path) -> ContentStoreResult<ContentRecord> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, hash: &str, text: &str, job_id: Uuid) -> ContentStoreResult<ContentRecord> {
        if let Some(existing) = self.get(hash).await? {
            return Ok(existing);
        }

        let record = ContentRecord {
            content_hash: hash.to_string(),
            first_job_id: job_id,
            result_text: text.to_string(),
            stored_at: Utc::now(),
        };

        let path = self.shard_path(hash)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(&record)?).await?;

        // Atomic rename: a concurrent writer for the same hash either
        // loses this race silently (its file replaces ours, both contain
        // the same bytes) or never gets here because `get` above already
        // caught the existing record.
        match tokio::fs::rename(&tmp_path, &path).await {
            Ok(()) => {}
            Err(e) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(e.into());
            }
        }

        self.index.lock().insert(hash.to_string(), record.clone());
        Ok(record)
    }

    async fn get(&self, hash: &str) -> ContentStoreResult<Option<ContentRecord>> {
        if let Some(record) = self.index.lock().get(hash).cloned() {
            return Ok(Some(record));
        }

        let path = self.shard_path(hash)?;
        match load_record(&path).await {
            Ok(record) => {
                self.index.lock().insert(hash.to_string(), record.clone());
                Ok(Some(record))
            }
            Err(ContentStoreError::Io { source }) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn stats(&self) -> ContentStoreResult<ContentStoreStats> {
        Ok(ContentStoreStats { entry_count: self.index.lock().len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (FsContentStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsContentStore::open(ContentStoreConfig::new(dir.path())).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (store, _dir) = store().await;
        let hash = "a".repeat(64);
        let job_id = Uuid::new_v4();

        let record = store.put(&hash, "hello world", job_id).await.unwrap();
        assert_eq!(record.first_job_id, job_id);

        let fetched = store.get(&hash).await.unwrap().unwrap();
        assert_eq!(fetched.result_text, "hello world");
    }

    #[tokio::test]
    async fn second_put_of_same_hash_is_a_no_op() {
        let (store, _dir) = store().await;
        let hash = "b".repeat(64);

        let first = store.put(&hash, "first text", Uuid::new_v4()).await.unwrap();
        let second = store.put(&hash, "second text", Uuid::new_v4()).await.unwrap();

        assert_eq!(first.first_job_id, second.first_job_id);
        assert_eq!(second.result_text, "first text");
    }

    #[tokio::test]
    async fn missing_hash_returns_none() {
        let (store, _dir) = store().await;
        assert!(store.get(&"c".repeat(64)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn index_is_rebuilt_from_files_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let hash = "d".repeat(64);

        {
            let store = FsContentStore::open(ContentStoreConfig::new(dir.path())).await.unwrap();
            store.put(&hash, "persisted", Uuid::new_v4()).await.unwrap();
        }

        let reopened = FsContentStore::open(ContentStoreConfig::new(dir.path())).await.unwrap();
        let record = reopened.get(&hash).await.unwrap().unwrap();
        assert_eq!(record.result_text, "persisted");
        assert_eq!(reopened.stats().await.unwrap().entry_count, 1);
    }
}
