//! In-process backend for tests and single-box development. Mirrors the
//! Redis backend's semantics (FIFO per queue, lease-based reservation,
//! dead-letter list) without touching a real Redis instance.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{QueueError, QueueResult};
use crate::messages::JobPayload;
use crate::types::{JobId, JobRecord, JobStatus, LeaseToken, LeasedJob, QueueCapabilities};

#[derive(Default)]
struct State {
    records: HashMap<String, JobRecord>,
    /// FIFO order of job ids per queue, independent of `records` so a
    /// retried job keeps its original position instead of jumping to the
    /// back.
    queues: HashMap<String, VecDeque<String>>,
    dead_letters: HashMap<String, VecDeque<String>>,
}

/// In-memory [`crate::backend::QueueBackend`]. Cheaply `Clone`: all state
/// lives behind the shared `Arc<Mutex<_>>`.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move any job whose lease has expired back onto its queue, retryable
    /// immediately. Call this periodically from a background task; the
    /// Redis backend does the equivalent with a sorted-set scan.
    pub fn reap_expired_leases(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .records
            .values()
            .filter(|r| r.lease_expired(now))
            .map(|r| r.job_id.as_str().to_string())
            .collect();

        for job_id in expired {
            let queue = state.records.get(&job_id).unwrap().queue.clone();
            let record = state.records.get_mut(&job_id).unwrap();
            record.schedule_retry(now, "lease expired".to_string());
            state.queues.entry(queue).or_default().push_back(job_id);
        }
    }
}

#[async_trait]
impl crate::backend::QueueBackend for MemoryBackend {
    async fn enqueue(&self, job_id: JobId, payload: JobPayload, max_retries: u32) -> QueueResult<()> {
        let queue = payload.queue_name().to_string();
        let record = JobRecord::new(job_id.clone(), payload, max_retries);

        let mut state = self.state.lock();
        state.records.insert(job_id.as_str().to_string(), record);
        state.queues.entry(queue).or_default().push_back(job_id.as_str().to_string());
        Ok(())
    }

    async fn reserve(&self, queue: &str, lease_for: Duration) -> QueueResult<Option<LeasedJob>> {
        let now = Utc::now();
        let mut state = self.state.lock();

        let Some(ids) = state.queues.get(queue) else {
            return Ok(None);
        };

        let eligible_idx = ids.iter().position(|id| {
            state
                .records
                .get(id)
                .map(|r| r.status.is_eligible(now))
                .unwrap_or(false)
        });

        let Some(idx) = eligible_idx else {
            return Ok(None);
        };

        let job_id = state.queues.get_mut(queue).unwrap().remove(idx).unwrap();
        let record = state.records.get_mut(&job_id).unwrap();

        let lease_token = LeaseToken::new();
        let lease_until = now + chrono::Duration::from_std(lease_for).unwrap_or(chrono::Duration::seconds(60));
        record.start_processing(lease_token.clone(), lease_until);

        Ok(Some(LeasedJob {
            record: record.clone(),
            lease_token,
            lease_until,
        }))
    }

    async fn complete(&self, job_id: &JobId, lease_token: &LeaseToken) -> QueueResult<()> {
        let mut state = self.state.lock();
        let record = state
            .records
            .get_mut(job_id.as_str())
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;

        check_lease(record, lease_token)?;
        record.complete();
        Ok(())
    }

    async fn fail(&self, job_id: &JobId, lease_token: &LeaseToken, error: String) -> QueueResult<()> {
        let mut state = self.state.lock();
        let record = state
            .records
            .get_mut(job_id.as_str())
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;

        check_lease(record, lease_token)?;
        record.dead_letter(error);
        let queue = record.queue.clone();

        state
            .dead_letters
            .entry(queue)
            .or_default()
            .push_back(job_id.as_str().to_string());
        Ok(())
    }

    async fn defer(&self, job_id: &JobId, lease_token: &LeaseToken, retry_at: DateTime<Utc>, error: String) -> QueueResult<()> {
        let mut state = self.state.lock();
        let record = state
            .records
            .get_mut(job_id.as_str())
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;

        check_lease(record, lease_token)?;

        if !record.can_retry() {
            record.dead_letter(error);
            let queue = record.queue.clone();
            state.dead_letters.entry(queue).or_default().push_back(job_id.as_str().to_string());
            return Ok(());
        }

        record.schedule_retry(retry_at, error);
        let queue = record.queue.clone();
        state.queues.entry(queue).or_default().push_back(job_id.as_str().to_string());
        Ok(())
    }

    async fn length(&self, queue: &str) -> QueueResult<usize> {
        let state = self.state.lock();
        Ok(state.queues.get(queue).map(|q| q.len()).unwrap_or(0))
    }

    async fn dead_letter_drain(&self, queue: &str, limit: usize) -> QueueResult<Vec<JobRecord>> {
        let mut state = self.state.lock();
        let Some(ids) = state.dead_letters.get_mut(queue) else {
            return Ok(Vec::new());
        };

        let mut popped = Vec::new();
        for _ in 0..limit {
            let Some(id) = ids.pop_front() else { break };
            popped.push(id);
        }

        let mut drained = Vec::new();
        for id in popped {
            if let Some(record) = state.records.remove(&id) {
                drained.push(record);
            }
        }
        Ok(drained)
    }

    async fn get_status(&self, job_id: &JobId) -> QueueResult<JobStatus> {
        let state = self.state.lock();
        state
            .records
            .get(job_id.as_str())
            .map(|r| r.status.clone())
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))
    }

    fn capabilities(&self) -> QueueCapabilities {
        QueueCapabilities::memory()
    }
}

fn check_lease(record: &JobRecord, lease_token: &LeaseToken) -> QueueResult<()> {
    match &record.lease_token {
        Some(current) if current == lease_token => Ok(()),
        Some(_) => Err(QueueError::InvalidLeaseToken),
        None => Err(QueueError::JobAlreadyTerminal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::QueueBackend;
    use crate::messages::RawJob;

    fn raw_payload() -> JobPayload {
        JobPayload::Raw(RawJob {
            scraper_name: "test_scraper".into(),
            source_id: "src-1".into(),
            raw_content: "hello".into(),
            content_hash: "abc123".into(),
            scraped_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn reserve_then_complete_round_trip() {
        let backend = MemoryBackend::new();
        let job_id = JobId::new();
        backend.enqueue(job_id.clone(), raw_payload(), 3).await.unwrap();

        let leased = backend.reserve("raw", Duration::from_secs(30)).await.unwrap().unwrap();
        assert_eq!(leased.job_id(), &job_id);

        backend.complete(&job_id, &leased.lease_token).await.unwrap();
        assert!(matches!(backend.get_status(&job_id).await.unwrap(), JobStatus::Completed { .. }));
    }

    #[tokio::test]
    async fn wrong_lease_token_is_rejected() {
        let backend = MemoryBackend::new();
        let job_id = JobId::new();
        backend.enqueue(job_id.clone(), raw_payload(), 3).await.unwrap();
        backend.reserve("raw", Duration::from_secs(30)).await.unwrap();

        let bogus = LeaseToken::new();
        let err = backend.complete(&job_id, &bogus).await.unwrap_err();
        assert!(matches!(err, QueueError::InvalidLeaseToken));
    }

    #[tokio::test]
    async fn defer_past_max_retries_dead_letters() {
        let backend = MemoryBackend::new();
        let job_id = JobId::new();
        backend.enqueue(job_id.clone(), raw_payload(), 0).await.unwrap();

        let leased = backend.reserve("raw", Duration::from_secs(30)).await.unwrap().unwrap();
        backend
            .defer(&job_id, &leased.lease_token, Utc::now(), "boom".into())
            .await
            .unwrap();

        let drained = backend.dead_letter_drain("raw", 10).await.unwrap();
        assert_eq!(drained.len(), 1);
    }

    #[tokio::test]
    async fn expired_leases_are_reaped_back_onto_the_queue() {
        let backend = MemoryBackend::new();
        let job_id = JobId::new();
        backend.enqueue(job_id.clone(), raw_payload(), 3).await.unwrap();
        backend.reserve("raw", Duration::from_millis(1)).await.unwrap();

        let later = Utc::now() + chrono::Duration::seconds(5);
        backend.reap_expired_leases(later);

        assert_eq!(backend.length("raw").await.unwrap(), 1);
    }
}
