//! Thin `git` subprocess wrapper for the publisher's working copy of the
//! external dataset repository. Every call shells out rather than linking a
//! git library, same as the rest of the pipeline's "subprocess contract"
//! idiom for anything that talks to an external tool.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::process::Command;

async fn run_git(repo: &Path, args: &[&str]) -> Result<String> {
    let out = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .await
        .with_context(|| format!("run git {args:?} in {}", repo.display()))?;

    if !out.status.success() {
        bail!(
            "git {:?} failed (code={:?}): {}",
            args,
            out.status.code(),
            String::from_utf8_lossy(&out.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&out.stdout).to_string())
}

pub async fn has_local_changes(repo: &Path) -> Result<bool> {
    let status = run_git(repo, &["status", "--porcelain=v1"]).await?;
    Ok(!status.trim().is_empty())
}

pub async fn stash_if_dirty(repo: &Path) -> Result<()> {
    if has_local_changes(repo).await? {
        run_git(repo, &["stash", "push", "-u", "-m", "pirate-publisher pre-pull stash"]).await?;
    }
    Ok(())
}

pub async fn fetch_and_pull(repo: &Path) -> Result<()> {
    stash_if_dirty(repo).await?;
    run_git(repo, &["fetch"]).await?;
    run_git(repo, &["pull", "--ff-only"]).await?;
    Ok(())
}

pub async fn branch_exists(repo: &Path, branch: &str) -> Result<bool> {
    let local = run_git(repo, &["branch", "--list", branch]).await?;
    if !local.trim().is_empty() {
        return Ok(true);
    }
    let remote = run_git(repo, &["ls-remote", "--heads", "origin", branch]).await?;
    Ok(!remote.trim().is_empty())
}

/// `data-update-<date>`, with `-HHMMSS` appended if that name is already
/// taken locally or on the remote.
pub async fn create_data_update_branch(repo: &Path, date: &str, now: chrono::DateTime<chrono::Utc>) -> Result<String> {
    let base_name = format!("data-update-{date}");
    let name = if branch_exists(repo, &base_name).await? {
        format!("{base_name}-{}", now.format("%H%M%S"))
    } else {
        base_name
    };

    run_git(repo, &["checkout", "-b", &name]).await?;
    Ok(name)
}

pub async fn commit_all(repo: &Path, message: &str) -> Result<()> {
    run_git(repo, &["add", "-A"]).await?;
    run_git(repo, &["-c", "user.name=pirate-publisher", "-c", "user.email=publisher@pantrypirateradio.local", "commit", "-m", message]).await?;
    Ok(())
}

pub async fn merge_no_ff(repo: &Path, branch: &str, into: &str) -> Result<()> {
    run_git(repo, &["checkout", into]).await?;
    run_git(repo, &["merge", "--no-ff", branch, "-m", &format!("merge {branch} into {into}")]).await?;
    Ok(())
}

pub async fn push(repo: &Path, remote: &str, branch: &str) -> Result<()> {
    run_git(repo, &["push", remote, branch]).await?;
    Ok(())
}
