use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pirate_content_store::ContentStore;
use pirate_core::errors::{ErrorKind, PirateError, PirateResult};
use pirate_hsds_schema::aligned_payload_schema;
use pirate_hsds_validator::validate;
use pirate_queue::{AlignedJob, LeasedJob, PirateQueue, RawJob, RecorderJob};
use tracing::{info, warn};

use crate::config::AlignmentConfig;
use crate::outcome::AlignmentOutcome;
use crate::prompt::{assemble, validator_prompt, with_feedback};
use crate::provider::{GenerateRequest, GenerateResponse, LlmProvider, ProviderError};
use crate::retry_schedule::{quota_retry_delay, NOT_AUTHENTICATED_MAX_ATTEMPTS, NOT_AUTHENTICATED_RETRY_INTERVAL};

/// Consumes the `raw` queue, producing one `aligned` job and one mirrored
/// `recorder` job per success. Owns no state of its own beyond its
/// dependencies — everything about a single job's progress lives in the
/// call stack of [`AlignmentWorker::align`], per the pipeline's
/// process-wide-state rule.
pub struct AlignmentWorker<P: LlmProvider> {
    provider: Arc<P>,
    content_store: Arc<dyn ContentStore>,
    config: AlignmentConfig,
}

impl<P: LlmProvider> AlignmentWorker<P> {
    pub fn new(provider: Arc<P>, content_store: Arc<dyn ContentStore>, config: AlignmentConfig) -> Self {
        Self { provider, content_store, config }
    }

    /// Run the full alignment algorithm for one raw job: dedup check,
    /// prompt assembly, provider call, validation retry loop, and (when
    /// configured) the validator-LLM hallucination pass.
    pub async fn align(&self, job: &RawJob, known_fields: &[String]) -> PirateResult<AlignmentOutcome> {
        if let Some(cached) = self.content_store.get(&job.content_hash).await.map_err(|e| {
            PirateError::storage(format!("content store lookup failed: {e}")).into_anyhow()
        })? {
            info!(content_hash = %job.content_hash, "content store hit, skipping provider call");
            let candidate: serde_json::Value = serde_json::from_str(&cached.result_text)
                .map_err(|e| PirateError::storage(format!("cached content is not valid JSON: {e}")).into_anyhow())?;
            return Ok(AlignmentOutcome { candidate, confidence: 1.0, cached: true });
        }

        let schema = aligned_payload_schema();
        let mut prompt = assemble(&job.raw_content, &schema, known_fields);
        let mut low_confidence_streak = 0u32;

        for attempt in 0..self.config.max_retries {
            let response = self
                .provider
                .generate(GenerateRequest {
                    prompt: prompt.clone(),
                    schema: schema.clone(),
                    strict: true,
                    max_tokens: self.config.max_tokens,
                    temperature: self.config.effective_temperature(),
                })
                .await
                .map_err(provider_error_to_pirate)?;

            let candidate = parse_candidate(&response.text, response.parsed)?;
            let mut outcome = validate(&candidate, known_fields);

            if outcome.confidence >= self.config.min_confidence {
                return Ok(AlignmentOutcome { candidate, confidence: outcome.confidence, cached: false });
            }

            if self.config.validator_llm_enabled && outcome.confidence >= self.config.retry_threshold {
                if let Some((corrected, corrected_outcome)) =
                    self.run_validator_check(&candidate, &schema, known_fields).await?
                {
                    if corrected_outcome.confidence >= self.config.min_confidence {
                        return Ok(AlignmentOutcome {
                            candidate: corrected,
                            confidence: corrected_outcome.confidence,
                            cached: false,
                        });
                    }
                    outcome = corrected_outcome;
                }
            }

            if outcome.confidence >= self.config.retry_threshold && attempt + 1 < self.config.max_retries {
                low_confidence_streak = 0;
                warn!(attempt, confidence = outcome.confidence, "low confidence, retrying with feedback");
                prompt = with_feedback(&prompt, &outcome.feedback_text);
                continue;
            }

            low_confidence_streak += 1;
            if low_confidence_streak >= 2 {
                return Err(PirateError::validation(format!(
                    "confidence {} below retry threshold twice in a row: {}",
                    outcome.confidence, outcome.feedback_text
                ))
                .into_anyhow());
            }

            prompt = with_feedback(&prompt, &outcome.feedback_text);
        }

        Err(PirateError::validation("exhausted max_retries without reaching min_confidence").into_anyhow())
    }

    /// Second provider call of the alignment pass, run only when
    /// `validator_llm_enabled` and the primary attempt landed between
    /// `retry_threshold` and `min_confidence`. Asks the provider to flag
    /// hallucinated fields and propose corrections; applies them and
    /// re-scores. Returns `None` (never an error) if the provider call or
    /// the response shape fails — a failed correction pass just falls back
    /// to the normal retry loop.
    async fn run_validator_check(
        &self,
        candidate: &serde_json::Value,
        schema: &serde_json::Value,
        known_fields: &[String],
    ) -> PirateResult<Option<(serde_json::Value, pirate_hsds_validator::ValidationOutcome)>> {
        let response = match self
            .provider
            .generate(GenerateRequest {
                prompt: validator_prompt(candidate, known_fields),
                schema: schema.clone(),
                strict: true,
                max_tokens: self.config.max_tokens,
                temperature: self.config.effective_temperature(),
            })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "validator-LLM check failed, skipping correction");
                return Ok(None);
            }
        };

        let check = match parse_validator_check(&response.text, response.parsed) {
            Ok(check) => check,
            Err(e) => {
                warn!(error = %e, "validator-LLM response did not match the expected shape, skipping correction");
                return Ok(None);
            }
        };

        if !check.hallucination_detected || check.suggested_corrections.is_empty() {
            return Ok(None);
        }

        let mut corrected = candidate.clone();
        apply_corrections(&mut corrected, &check.suggested_corrections);
        let corrected_outcome = validate(&corrected, known_fields);
        Ok(Some((corrected, corrected_outcome)))
    }

    /// Persist the accepted candidate to the content store (a no-op on a
    /// cache hit) and enqueue the `aligned` and `recorder` fanout.
    pub async fn persist_and_fanout(
        &self,
        queue: &PirateQueue,
        job: &RawJob,
        outcome: &AlignmentOutcome,
    ) -> PirateResult<()> {
        if !outcome.cached {
            self.content_store
                .put(&job.content_hash, &outcome.candidate.to_string(), uuid::Uuid::new_v4())
                .await
                .map_err(|e| PirateError::storage(format!("content store write failed: {e}")).into_anyhow())?;
        }

        queue
            .enqueue_aligned(
                AlignedJob {
                    source_id: job.source_id.clone(),
                    content_hash: job.content_hash.clone(),
                    hsds_candidate: outcome.candidate.clone(),
                    confidence: outcome.confidence,
                    aligned_at: Utc::now(),
                },
                3,
            )
            .await
            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

        queue
            .enqueue_recorder(
                RecorderJob {
                    source_id: job.source_id.clone(),
                    canonical_id: uuid::Uuid::nil(),
                    hsds_record: outcome.candidate.clone(),
                    reconciled_at: Utc::now(),
                },
                3,
            )
            .await
            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;

        Ok(())
    }

    /// Drive one reservation off `queue`'s `raw` queue through
    /// `align`/`persist_and_fanout`, translating the outcome into the
    /// queue completion call the failure-semantics table specifies.
    /// Returns `Ok(None)` if there was nothing to reserve.
    pub async fn run_once(&self, queue: &PirateQueue, lease_for: Duration) -> PirateResult<Option<LeasedJob>> {
        let Some(leased) = queue
            .reserve("raw", lease_for)
            .await
            .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?
        else {
            return Ok(None);
        };

        let pirate_queue::JobPayload::Raw(job) = leased.payload().clone() else {
            queue
                .fail(leased.job_id(), &leased.lease_token, "raw queue job did not carry a RawJob payload".to_string())
                .await
                .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            return Ok(Some(leased));
        };

        match self.align(&job, &[]).await {
            Ok(outcome) => {
                self.persist_and_fanout(queue, &job, &outcome).await?;
                queue
                    .complete(leased.job_id(), &leased.lease_token)
                    .await
                    .map_err(|e| PirateError::storage(e.to_string()).into_anyhow())?;
            }
            Err(err) => self.handle_failure(queue, &leased, err).await?,
        }

        Ok(Some(leased))
    }

    async fn handle_failure(&self, queue: &PirateQueue, leased: &LeasedJob, err: anyhow::Error) -> PirateResult<()> {
        let pirate_err = PirateError::normalize(err);

        let outcome = match pirate_err.kind {
            ErrorKind::NotAuthenticated if leased.record.attempt >= NOT_AUTHENTICATED_MAX_ATTEMPTS => {
                warn!(
                    attempts = leased.record.attempt,
                    "provider still not authenticated after the retry cap, dead-lettering"
                );
                queue.fail(leased.job_id(), &leased.lease_token, pirate_err.message.clone()).await
            }
            ErrorKind::NotAuthenticated => {
                warn!(attempt = leased.record.attempt, "provider not authenticated, deferring and raising health flag");
                queue
                    .defer(
                        leased.job_id(),
                        &leased.lease_token,
                        Utc::now() + chrono::Duration::from_std(NOT_AUTHENTICATED_RETRY_INTERVAL).unwrap(),
                        pirate_err.message.clone(),
                    )
                    .await
            }
            ErrorKind::QuotaExceeded => {
                let delay = quota_retry_delay(
                    leased.record.attempt,
                    Duration::from_secs(3600),
                    1.5,
                    Duration::from_secs(14_400),
                );
                queue
                    .defer(
                        leased.job_id(),
                        &leased.lease_token,
                        Utc::now() + chrono::Duration::from_std(delay).unwrap(),
                        pirate_err.message.clone(),
                    )
                    .await
            }
            ErrorKind::RateLimited | ErrorKind::TransientNetwork => {
                queue.defer_with_backoff(leased, pirate_err.message.clone()).await
            }
            _ => queue.fail(leased.job_id(), &leased.lease_token, pirate_err.message.clone()).await,
        };

        outcome.map_err(|e| PirateError::storage(e.to_string()).into_anyhow())
    }
}

fn parse_candidate(text: &str, parsed: Option<serde_json::Value>) -> PirateResult<serde_json::Value> {
    match parsed {
        Some(value) => Ok(value),
        None => serde_json::from_str(text)
            .map_err(|e| PirateError::validation(format!("provider output was not valid JSON: {e}")).into_anyhow()),
    }
}

/// The validator-LLM's structured response: whether it found a hallucinated
/// field, and corrections keyed by the same `entity[idx].field` paths
/// `pirate_hsds_validator::validate`'s `missing_fields` use.
#[derive(Debug, Clone, serde::Deserialize)]
struct ValidatorCheck {
    hallucination_detected: bool,
    #[serde(default)]
    #[allow(dead_code)]
    mismatched_fields: Vec<String>,
    #[serde(default)]
    suggested_corrections: serde_json::Map<String, serde_json::Value>,
}

fn parse_validator_check(text: &str, parsed: Option<serde_json::Value>) -> PirateResult<ValidatorCheck> {
    let value = match parsed {
        Some(value) => value,
        None => serde_json::from_str(text)
            .map_err(|e| PirateError::validation(format!("validator output was not valid JSON: {e}")).into_anyhow())?,
    };
    serde_json::from_value(value)
        .map_err(|e| PirateError::validation(format!("validator output did not match the expected shape: {e}")).into_anyhow())
}

/// Apply `entity[idx].field` corrections in place. Paths that don't parse
/// or don't address an existing item are skipped rather than erroring —
/// the validator-LLM pass is a best-effort rescue, not a hard requirement.
fn apply_corrections(candidate: &mut serde_json::Value, corrections: &serde_json::Map<String, serde_json::Value>) {
    for (path, value) in corrections {
        let Some((entity, idx, field)) = parse_entity_path(path) else { continue };
        let Some(item) = candidate.get_mut(entity).and_then(|e| e.get_mut(idx)) else { continue };
        let Some(obj) = item.as_object_mut() else { continue };
        obj.insert(field.to_string(), value.clone());
    }
}

/// Parses `"entity[idx].field"` into its three parts.
fn parse_entity_path(path: &str) -> Option<(&str, usize, &str)> {
    let open = path.find('[')?;
    let close = path.find(']')?;
    if close < open {
        return None;
    }
    let entity = &path[..open];
    let idx: usize = path[open + 1..close].parse().ok()?;
    let field = path[close + 1..].strip_prefix('.')?;
    Some((entity, idx, field))
}

fn provider_error_to_pirate(err: ProviderError) -> anyhow::Error {
    match err {
        ProviderError::RateLimited { retry_after_secs } => {
            let mut e = PirateError::rate_limited("provider rate limited the request");
            if let Some(secs) = retry_after_secs {
                e = e.with_retry_after(Duration::from_secs(secs));
            }
            e.into_anyhow()
        }
        ProviderError::QuotaExceeded => PirateError::quota_exceeded("provider quota exhausted").into_anyhow(),
        ProviderError::NotAuthenticated => PirateError::not_authenticated("provider credentials rejected").into_anyhow(),
        ProviderError::Transient(msg) => PirateError::transient_network(msg).into_anyhow(),
        ProviderError::Permanent(msg) => PirateError::validation(msg).into_anyhow(),
    }
}

#[cfg(test)]
mod tests {
    use pirate_content_store::{ContentStoreConfig, FsContentStore};
    use pirate_core::errors::ErrorKind;
    use pirate_queue::RawJob;
    use serde_json::json;

    use super::*;
    use crate::testing::{Scripted, StubProvider};

    fn raw_job() -> RawJob {
        RawJob {
            scraper_name: "food_bank_x".into(),
            source_id: "src-1".into(),
            raw_content: "123 Main St, open Tue-Thu".into(),
            content_hash: "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85".into(),
            scraped_at: Utc::now(),
        }
    }

    fn valid_candidate() -> serde_json::Value {
        json!({
            "organization": [{"id": "o1", "name": "St. Mary's Food Bank"}],
            "service": [{"id": "s1", "name": "Pantry", "status": "active"}],
            "location": [{"id": "l1", "latitude": 40.7128, "longitude": -74.0060}],
        })
    }

    fn response_for(candidate: serde_json::Value) -> GenerateResponse {
        GenerateResponse { text: candidate.to_string(), parsed: Some(candidate) }
    }

    #[tokio::test]
    async fn dedup_short_circuits_the_provider_call() {
        let dir = tempfile::tempdir().unwrap();
        let content_store = Arc::new(FsContentStore::open(ContentStoreConfig::new(dir.path())).await.unwrap());
        let job = raw_job();
        content_store.put(&job.content_hash, &valid_candidate().to_string(), uuid::Uuid::new_v4()).await.unwrap();

        let provider = Arc::new(StubProvider::new(vec![]));
        let worker = AlignmentWorker::new(provider.clone(), content_store, AlignmentConfig::default());

        let outcome = worker.align(&job, &[]).await.unwrap();

        assert!(outcome.cached);
        assert_eq!(outcome.confidence, 1.0);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn low_confidence_candidate_is_retried_with_feedback_then_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let content_store = Arc::new(FsContentStore::open(ContentStoreConfig::new(dir.path())).await.unwrap());

        let mut missing_status = valid_candidate();
        missing_status["service"][0].as_object_mut().unwrap().remove("status");

        let provider = Arc::new(StubProvider::new(vec![
            Scripted::Ok(response_for(missing_status)),
            Scripted::Ok(response_for(valid_candidate())),
        ]));

        let config = AlignmentConfig { min_confidence: 0.92, retry_threshold: 0.5, max_retries: 5, ..AlignmentConfig::default() };
        let worker = AlignmentWorker::new(provider.clone(), content_store, config);

        let outcome = worker.align(&raw_job(), &[]).await.unwrap();

        assert!(!outcome.cached);
        assert!(outcome.confidence >= 0.92);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn two_low_confidence_candidates_in_a_row_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let content_store = Arc::new(FsContentStore::open(ContentStoreConfig::new(dir.path())).await.unwrap());

        let provider = Arc::new(StubProvider::new(vec![
            Scripted::Ok(response_for(json!({}))),
            Scripted::Ok(response_for(json!({}))),
        ]));

        let worker = AlignmentWorker::new(provider.clone(), content_store, AlignmentConfig::default());

        let err = worker.align(&raw_job(), &[]).await.unwrap_err();

        assert_eq!(PirateError::normalize(err).kind, ErrorKind::ValidationError);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn validator_llm_pass_rescues_a_correctable_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let content_store = Arc::new(FsContentStore::open(ContentStoreConfig::new(dir.path())).await.unwrap());

        let mut missing_status = valid_candidate();
        missing_status["service"][0].as_object_mut().unwrap().remove("status");

        let validator_response = json!({
            "hallucination_detected": true,
            "mismatched_fields": [],
            "suggested_corrections": {"service[0].status": "active"},
        });

        let provider = Arc::new(StubProvider::new(vec![
            Scripted::Ok(response_for(missing_status)),
            Scripted::Ok(response_for(validator_response)),
        ]));

        let config = AlignmentConfig {
            min_confidence: 0.92,
            retry_threshold: 0.5,
            max_retries: 5,
            validator_llm_enabled: true,
            ..AlignmentConfig::default()
        };
        let worker = AlignmentWorker::new(provider.clone(), content_store, config);

        let outcome = worker.align(&raw_job(), &[]).await.unwrap();

        assert!(!outcome.cached);
        assert!(outcome.confidence >= 0.92);
        assert_eq!(outcome.candidate["service"][0]["status"], "active");
        assert_eq!(provider.call_count(), 2);
    }
}
