use std::time::Duration;

use pirate_queue::backend::memory::MemoryBackend;
use pirate_queue::backend::QueueBackend;
use pirate_queue::{JobPayload, JobStatus, RawJob};

fn raw(source_id: &str) -> RawJob {
    RawJob {
        scraper_name: "conformance_scraper".into(),
        source_id: source_id.into(),
        raw_content: "<html></html>".into(),
        content_hash: "hash".into(),
        scraped_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn fifo_order_is_preserved_across_retries() {
    let backend = MemoryBackend::new();

    let first = pirate_queue::JobId::new();
    let second = pirate_queue::JobId::new();
    backend.enqueue(first.clone(), JobPayload::Raw(raw("first")), 3).await.unwrap();
    backend.enqueue(second.clone(), JobPayload::Raw(raw("second")), 3).await.unwrap();

    let leased = backend.reserve("raw", Duration::from_secs(30)).await.unwrap().unwrap();
    assert_eq!(leased.job_id(), &first);

    backend
        .defer(&first, &leased.lease_token, chrono::Utc::now(), "transient".into())
        .await
        .unwrap();

    // First job is due again immediately and was pushed behind `second`;
    // FIFO ordering means `second` comes out next.
    let next = backend.reserve("raw", Duration::from_secs(30)).await.unwrap().unwrap();
    assert_eq!(next.job_id(), &second);
}

#[tokio::test]
async fn completed_jobs_do_not_reappear() {
    let backend = MemoryBackend::new();
    let job_id = pirate_queue::JobId::new();
    backend.enqueue(job_id.clone(), JobPayload::Raw(raw("x")), 3).await.unwrap();

    let leased = backend.reserve("raw", Duration::from_secs(30)).await.unwrap().unwrap();
    backend.complete(&job_id, &leased.lease_token).await.unwrap();

    assert!(backend.reserve("raw", Duration::from_secs(30)).await.unwrap().is_none());
    assert!(matches!(backend.get_status(&job_id).await.unwrap(), JobStatus::Completed { .. }));
}

#[tokio::test]
async fn dead_letter_drain_removes_drained_jobs() {
    let backend = MemoryBackend::new();
    let job_id = pirate_queue::JobId::new();
    backend.enqueue(job_id.clone(), JobPayload::Raw(raw("x")), 0).await.unwrap();

    let leased = backend.reserve("raw", Duration::from_secs(30)).await.unwrap().unwrap();
    backend.fail(&job_id, &leased.lease_token, "permanent".into()).await.unwrap();

    let drained = backend.dead_letter_drain("raw", 10).await.unwrap();
    assert_eq!(drained.len(), 1);
    assert!(backend.dead_letter_drain("raw", 10).await.unwrap().is_empty());
}
