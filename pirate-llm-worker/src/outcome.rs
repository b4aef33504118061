use serde_json::Value;

/// The result of a successful alignment pass: a validated HSDS candidate
/// and the confidence it was accepted at.
#[derive(Debug, Clone)]
pub struct AlignmentOutcome {
    pub candidate: Value,
    pub confidence: f64,
    /// Whether this came from the content-store cache rather than a live
    /// provider call (content-hash dedup short-circuit).
    pub cached: bool,
}
