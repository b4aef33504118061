use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pirate_core::errors::{PirateError, PirateResult};
use pirate_queue::{JobPayload, PirateQueue};
use uuid::Uuid;

use crate::writer::RecordWriter;

/// Consumes the `recorder` queue, writing each job's reconciled HSDS record
/// to the dated output tree and refreshing the per-scraper latest pointer.
pub struct Recorder {
    writer: Arc<dyn RecordWriter>,
}

impl Recorder {
    pub fn new(writer: Arc<dyn RecordWriter>) -> Self {
        Self { writer }
    }

    pub async fn run_once(&self, queue: &PirateQueue, lease_for: Duration) -> PirateResult<bool> {
        let Some(leased) = queue
            .reserve("recorder", lease_for)
            .await
            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?
        else {
            return Ok(false);
        };

        let JobPayload::Recorder(job) = leased.payload().clone() else {
            queue
                .fail(leased.job_id(), &leased.lease_token, "recorder queue job did not carry a RecorderJob payload".to_string())
                .await
                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            return Ok(true);
        };

        let date = job.reconciled_at.format("%Y-%m-%d").to_string();
        let job_id = Uuid::parse_str(leased.job_id().as_str()).unwrap_or(job.canonical_id);

        let result = async {
            self.writer.write_job(&date, &job.source_id, job_id, &job.hsds_record).await?;
            self.writer.update_summary(&date, &job.source_id, job_id, Utc::now()).await?;
            self.writer.update_latest_pointer(&job.source_id, &job.hsds_record).await?;
            Ok::<(), crate::error::RecorderError>(())
        }
        .await;

        match result {
            Ok(()) => {
                queue
                    .complete(leased.job_id(), &leased.lease_token)
                    .await
                    .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            }
            Err(err) => {
                queue
                    .defer_with_backoff(&leased, err.to_string())
                    .await
                    .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            }
        }

        Ok(true)
    }
}
