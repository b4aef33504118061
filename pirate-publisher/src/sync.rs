//! Discover recorder files changed since the watermark and mirror them
//! (plus a content-store snapshot) into the external dataset repo's
//! working copy.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use tracing::debug;

use crate::watermark::PublisherState;

#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
}

/// Walk `recorder_root/daily` for `.json` files modified within the last
/// `days_to_sync` days that `state` hasn't already processed.
pub async fn discover_unprocessed(recorder_root: &Path, state: &PublisherState, days_to_sync: i64) -> anyhow::Result<Vec<DiscoveredFile>> {
    let cutoff = Utc::now() - Duration::days(days_to_sync);
    let daily_root = recorder_root.join("daily");
    let mut found = Vec::new();
    let mut stack = vec![daily_root.clone()];

    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                stack.push(path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let relative = path.strip_prefix(recorder_root).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            if state.is_processed(&relative) {
                continue;
            }

            let modified: chrono::DateTime<Utc> = entry.metadata().await?.modified()?.into();
            if modified < cutoff {
                continue;
            }

            found.push(DiscoveredFile { relative_path: relative, absolute_path: path });
        }
    }

    debug!(count = found.len(), "discovered unprocessed recorder files");
    Ok(found)
}

/// Mirror `recorder_root/latest/*.json` into `repo_root/latest`,
/// overwriting whatever is already there. Unlike `daily/`, these pointer
/// files are updated in place rather than appended, so every tick copies
/// all of them rather than diffing against a watermark.
pub async fn mirror_latest(recorder_root: &Path, repo_root: &Path) -> anyhow::Result<usize> {
    let latest_root = recorder_root.join("latest");
    let dest_root = repo_root.join("latest");
    tokio::fs::create_dir_all(&dest_root).await?;

    let mut entries = match tokio::fs::read_dir(&latest_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut copied = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_dir() || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        tokio::fs::copy(&path, dest_root.join(entry.file_name())).await?;
        copied += 1;
    }

    debug!(count = copied, "mirrored latest pointers into the external repo");
    Ok(copied)
}

/// Copy a discovered file into the external repo's working copy at the
/// same relative path, creating parent directories as needed.
pub async fn mirror_into_repo(file: &DiscoveredFile, repo_root: &Path) -> anyhow::Result<()> {
    let dest = repo_root.join(&file.relative_path);
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(&file.absolute_path, &dest).await?;
    Ok(())
}

/// Recursively copy `content_store_root` into `repo_root/content_store`.
pub async fn sync_content_store(content_store_root: &Path, repo_root: &Path) -> anyhow::Result<()> {
    let dest_root = repo_root.join("content_store");
    copy_dir_recursive(content_store_root, &dest_root).await
}

fn copy_dir_recursive<'a>(src: &'a Path, dest: &'a Path) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        tokio::fs::create_dir_all(dest).await?;
        let mut entries = match tokio::fs::read_dir(src).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let dest_path = dest.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                copy_dir_recursive(&path, &dest_path).await?;
            } else {
                tokio::fs::copy(&path, &dest_path).await?;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mirror_latest_copies_every_pointer_file() {
        let recorder_root = tempfile::tempdir().unwrap();
        let repo_root = tempfile::tempdir().unwrap();
        let latest_dir = recorder_root.path().join("latest");
        tokio::fs::create_dir_all(&latest_dir).await.unwrap();
        tokio::fs::write(latest_dir.join("food_bank_x_latest.json"), "{}").await.unwrap();
        tokio::fs::write(latest_dir.join("food_bank_y_latest.json"), "{}").await.unwrap();
        tokio::fs::write(latest_dir.join("README.md"), "not json").await.unwrap();

        let copied = mirror_latest(recorder_root.path(), repo_root.path()).await.unwrap();

        assert_eq!(copied, 2);
        assert!(repo_root.path().join("latest/food_bank_x_latest.json").exists());
        assert!(repo_root.path().join("latest/food_bank_y_latest.json").exists());
        assert!(!repo_root.path().join("latest/README.md").exists());
    }

    #[tokio::test]
    async fn mirror_latest_overwrites_an_existing_pointer() {
        let recorder_root = tempfile::tempdir().unwrap();
        let repo_root = tempfile::tempdir().unwrap();
        let latest_dir = recorder_root.path().join("latest");
        tokio::fs::create_dir_all(&latest_dir).await.unwrap();
        tokio::fs::write(latest_dir.join("food_bank_x_latest.json"), "{\"v\":2}").await.unwrap();

        let repo_latest_dir = repo_root.path().join("latest");
        tokio::fs::create_dir_all(&repo_latest_dir).await.unwrap();
        tokio::fs::write(repo_latest_dir.join("food_bank_x_latest.json"), "{\"v\":1}").await.unwrap();

        mirror_latest(recorder_root.path(), repo_root.path()).await.unwrap();

        let contents = tokio::fs::read_to_string(repo_latest_dir.join("food_bank_x_latest.json")).await.unwrap();
        assert_eq!(contents, "{\"v\":2}");
    }

    #[tokio::test]
    async fn mirror_latest_is_a_no_op_when_recorder_has_no_latest_dir() {
        let recorder_root = tempfile::tempdir().unwrap();
        let repo_root = tempfile::tempdir().unwrap();

        let copied = mirror_latest(recorder_root.path(), repo_root.path()).await.unwrap();
        assert_eq!(copied, 0);
    }
}
