//! Scrapers are discovered by filesystem convention rather than registered
//! in code: each executable file directly under the scrapers directory is
//! one scraper, named by its file stem. This mirrors the subprocess-only
//! "implement this one contract in whatever language you like" shape the
//! rest of the pipeline's external interfaces use (the LLM provider and
//! geocoder are the same kind of narrow, swappable contract).

use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ScraperSpec {
    pub name: String,
    pub command: PathBuf,
    pub timeout: Duration,
}

impl ScraperSpec {
    pub fn new(name: impl Into<String>, command: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { name: name.into(), command: command.into(), timeout }
    }
}

/// Walk `scrapers_dir` one level deep and return a [`ScraperSpec`] for
/// every executable regular file found, using `timeout` for each.
pub fn discover_scrapers(scrapers_dir: &Path, timeout: Duration) -> std::io::Result<Vec<ScraperSpec>> {
    let mut found = Vec::new();
    let entries = match std::fs::read_dir(scrapers_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() || !is_executable(&path) {
            continue;
        }
        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }
        found.push(ScraperSpec::new(name, path, timeout));
    }

    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn discovers_only_executable_files() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("food_bank_x");
        std::fs::write(&exe, "#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let readme = dir.path().join("README.md");
        std::fs::write(&readme, "not a scraper").unwrap();

        let specs = discover_scrapers(dir.path(), Duration::from_secs(60)).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "food_bank_x");
    }

    #[test]
    fn missing_directory_yields_empty_list() {
        let specs = discover_scrapers(Path::new("/no/such/dir"), Duration::from_secs(60)).unwrap();
        assert!(specs.is_empty());
    }
}
