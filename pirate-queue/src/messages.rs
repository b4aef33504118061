//! The pipeline runs exactly three named queues (`raw`, `aligned`,
//! `recorder`) and each carries exactly one payload shape. Earlier
//! iterations of this queue passed a duck-typed `serde_json::Value` plus a
//! free-form `job_type` string; a misspelled type tag was only caught by
//! the worker that eventually failed to deserialize it. [`JobPayload`]
//! closes that hole by making the three payload shapes a closed enum: the
//! queue a message lands on is a property of the variant, not a second
//! piece of state that can drift out of sync with the first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scraper's raw output, not yet content-hashed or aligned to HSDS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJob {
    pub scraper_name: String,
    pub source_id: String,
    pub raw_content: String,
    pub content_hash: String,
    pub scraped_at: DateTime<Utc>,
}

/// An LLM-aligned HSDS candidate, ready for the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedJob {
    pub source_id: String,
    pub content_hash: String,
    pub hsds_candidate: serde_json::Value,
    pub confidence: f64,
    pub aligned_at: DateTime<Utc>,
}

/// A reconciled HSDS record, ready to be written to the dated JSON tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderJob {
    pub source_id: String,
    pub canonical_id: uuid::Uuid,
    pub hsds_record: serde_json::Value,
    pub reconciled_at: DateTime<Utc>,
}

/// The closed set of payload shapes a job in the pipeline can carry. The
/// queue name a message is enqueued on is derived from the variant, not
/// passed separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum JobPayload {
    Raw(RawJob),
    Aligned(AlignedJob),
    Recorder(RecorderJob),
}

impl JobPayload {
    /// The name of the queue this payload belongs on.
    pub fn queue_name(&self) -> &'static str {
        match self {
            JobPayload::Raw(_) => "raw",
            JobPayload::Aligned(_) => "aligned",
            JobPayload::Recorder(_) => "recorder",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_name_follows_the_variant() {
        let raw = JobPayload::Raw(RawJob {
            scraper_name: "food_bank_x".into(),
            source_id: "abc".into(),
            raw_content: "<html></html>".into(),
            content_hash: "deadbeef".into(),
            scraped_at: Utc::now(),
        });
        assert_eq!(raw.queue_name(), "raw");
    }
}
