//! Runs one scraper subprocess to completion, enforcing its timeout and
//! hashing its output. stdin is closed immediately; stdout is the payload;
//! stderr is captured and logged, never parsed.

use std::process::Stdio;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::time::{sleep, timeout, Duration};
use tracing::{info, warn};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::scraper::ScraperSpec;

/// A scraper's raw stdout plus its computed content hash.
#[derive(Debug)]
pub struct ScrapeOutput {
    pub raw_content: String,
    pub content_hash: String,
}

const KILL_GRACE_PERIOD: Duration = Duration::from_secs(5);

pub async fn run_scraper(spec: &ScraperSpec) -> OrchestratorResult<ScrapeOutput> {
    let mut child = Command::new(&spec.command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.shutdown().await;
    }

    let pid = child.id().map(|id| id as i32);
    let name = spec.name.clone();

    let wait = async {
        let mut stdout = String::new();
        let mut stderr = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout).await?;
        }
        if let Some(mut err) = child.stderr.take() {
            err.read_to_string(&mut stderr).await?;
        }
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, stdout, stderr))
    };

    match timeout(spec.timeout, wait).await {
        Ok(Ok((status, stdout, stderr))) => {
            if !stderr.trim().is_empty() {
                warn!(scraper = %name, stderr = %stderr, "scraper wrote to stderr");
            }
            if !status.success() {
                return Err(OrchestratorError::NonZeroExit { name, code: status.code() });
            }
            let content_hash = hex::encode(Sha256::digest(stdout.as_bytes()).as_slice());
            info!(scraper = %name, bytes = stdout.len(), content_hash = %content_hash, "scraper completed");
            Ok(ScrapeOutput { raw_content: stdout, content_hash })
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_elapsed) => {
            if let Some(pid) = pid {
                let _ = signal::kill(Pid::from_raw(pid), Signal::SIGTERM);
                sleep(KILL_GRACE_PERIOD).await;
                let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
            }
            Err(OrchestratorError::Timeout { name, timeout: spec.timeout })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::ScraperSpec;
    use std::os::unix::fs::PermissionsExt;

    async fn scraper_script(body: &str) -> (tempfile::TempDir, ScraperSpec) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scraper.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let spec = ScraperSpec::new("test_scraper", path, Duration::from_secs(5));
        (dir, spec)
    }

    #[tokio::test]
    async fn successful_scrape_hashes_stdout() {
        let (_dir, spec) = scraper_script("echo -n hello").await;
        let output = run_scraper(&spec).await.unwrap();
        assert_eq!(output.raw_content, "hello");
        assert_eq!(output.content_hash, hex::encode(Sha256::digest(b"hello").as_slice()));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let (_dir, spec) = scraper_script("exit 3").await;
        let err = run_scraper(&spec).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::NonZeroExit { code: Some(3), .. }));
    }

    #[tokio::test]
    async fn timeout_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slow.sh");
        std::fs::write(&path, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let spec = ScraperSpec::new("slow", path, Duration::from_millis(50));

        let err = run_scraper(&spec).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Timeout { .. }));
    }
}
