//! One publisher tick: pull, discover, branch, sync, dump, export, commit,
//! push. Runs on a fixed interval and once at startup; never rebases,
//! never force-pushes, never deletes anything from the external repo.

use anyhow::Result;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::PublisherConfig;
use crate::git;
use crate::sql_dump;
use crate::sync;
use crate::watermark::{state_path, PublisherState};

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub files_synced: usize,
    pub branch: Option<String>,
    pub sql_dump_written: bool,
    pub sqlite_export_written: bool,
    pub pushed: bool,
}

pub struct Publisher {
    config: PublisherConfig,
    pool: PgPool,
}

impl Publisher {
    pub fn new(config: PublisherConfig, pool: PgPool) -> Self {
        Self { config, pool }
    }

    pub async fn run_tick(&self) -> Result<TickReport> {
        let mut report = TickReport::default();
        let repo = &self.config.external_repo_root;

        git::fetch_and_pull(repo).await?;

        let watermark_path = state_path(&self.config.recorder_output_root);
        let mut state = PublisherState::load(&watermark_path).await?;
        let discovered = sync::discover_unprocessed(&self.config.recorder_output_root, &state, self.config.days_to_sync).await?;

        let now = Utc::now();
        let date = now.format("%Y-%m-%d").to_string();
        let branch = git::create_data_update_branch(repo, &date, now).await?;
        report.branch = Some(branch.clone());

        for file in &discovered {
            sync::mirror_into_repo(file, repo).await?;
            state.mark_processed(file.relative_path.clone());
        }

        // Pointer files, not append-only like daily/: mirrored every tick
        // regardless of the watermark, since they're overwritten in place.
        let latest_mirrored = sync::mirror_latest(&self.config.recorder_output_root, repo).await?;
        report.files_synced = discovered.len() + latest_mirrored;

        sync::sync_content_store(&self.config.content_store_root, repo).await?;

        let timestamp = now.format("%Y%m%d%H%M%S").to_string();
        let dumps_dir = repo.join("sql_dumps");
        match sql_dump::dump_if_safe(&self.config.database_url, &self.pool, &dumps_dir, self.config.ratchet, &timestamp).await? {
            Some(_) => report.sql_dump_written = true,
            None => warn!("SQL dump skipped this tick (ratchet or nothing to dump)"),
        }

        let sqlite_dir = repo.join("sqlite");
        sql_dump::export_sqlite(&self.pool, &sqlite_dir, &timestamp).await?;
        report.sqlite_export_written = true;

        if !git::has_local_changes(repo).await? {
            info!("nothing changed in the working copy this tick, nothing to commit");
            state.last_run_at = Some(now);
            state.save(&watermark_path).await?;
            return Ok(report);
        }

        git::commit_all(repo, &format!("data update {date}")).await?;
        git::merge_no_ff(repo, &branch, &self.config.main_branch).await?;

        if self.config.push_enabled {
            git::push(repo, &self.config.remote, &self.config.main_branch).await?;
            report.pushed = true;
        } else {
            info!("READ-ONLY: PUBLISHER_PUSH_ENABLED is not set, stopping before push");
        }

        state.last_run_at = Some(now);
        state.save(&watermark_path).await?;

        Ok(report)
    }
}
