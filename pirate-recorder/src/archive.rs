//! On-request archival of a day's raw recorder output into a single
//! gzip-compressed bundle, for the publisher (or an operator) to ship
//! without walking the live `daily/` tree.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::config::RecorderConfig;
use crate::error::RecorderResult;

/// Walk `<root>/daily/<date>`, gather every `.json` file keyed by its path
/// relative to that directory, gzip the resulting manifest, and write it
/// atomically to `<root>/archive/<date>.json.gz`.
pub async fn archive_day(config: &RecorderConfig, date: &str) -> RecorderResult<PathBuf> {
    let daily_dir = config.root.join("daily").join(date);
    let manifest = collect_manifest(&daily_dir).await?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&serde_json::to_vec(&manifest)?)?;
    let gz_bytes = encoder.finish()?;

    let archive_dir = config.root.join("archive");
    tokio::fs::create_dir_all(&archive_dir).await?;
    let path = archive_dir.join(format!("{date}.json.gz"));
    let tmp_path = archive_dir.join(format!("{date}.json.gz.tmp"));

    tokio::fs::write(&tmp_path, &gz_bytes).await?;
    tokio::fs::rename(&tmp_path, &path).await?;

    Ok(path)
}

async fn collect_manifest(dir: &Path) -> RecorderResult<BTreeMap<String, Value>> {
    let mut manifest = BTreeMap::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
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
            let relative = path.strip_prefix(dir).unwrap_or(&path).to_string_lossy().replace('\\', "/");
            let bytes = tokio::fs::read(&path).await?;
            manifest.insert(relative, serde_json::from_slice(&bytes)?);
        }
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[tokio::test]
    async fn archive_bundles_every_job_file_into_one_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let config = RecorderConfig::new(dir.path());
        let scrapers_dir = dir.path().join("daily/2026-08-01/scrapers/food_bank_x");
        tokio::fs::create_dir_all(&scrapers_dir).await.unwrap();
        tokio::fs::write(scrapers_dir.join("job1.json"), br#"{"name":"Food Bank"}"#).await.unwrap();

        let archive_path = archive_day(&config, "2026-08-01").await.unwrap();
        let gz_bytes = tokio::fs::read(&archive_path).await.unwrap();

        let mut decoder = GzDecoder::new(gz_bytes.as_slice());
        let mut decompressed = String::new();
        decoder.read_to_string(&mut decompressed).unwrap();

        assert!(decompressed.contains("Food Bank"));
    }
}
