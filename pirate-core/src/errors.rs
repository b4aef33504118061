//! # Error taxonomy
//!
//! Pantry Pirate Radio classifies failures by *kind*, not by which crate
//! raised them, so that a failure can cross a queue boundary (worker A
//! enqueues for worker B) and still be handled the same way on the other
//! side. This mirrors the kind-not-type taxonomy the pipeline spec lays
//! out: local retry policy and the way a failure is surfaced both hang off
//! [`ErrorKind`], not off a stack of concrete Rust error types.

use std::fmt;

use anyhow::Error as AnyError;

/// Convenience result alias used throughout the pipeline.
pub type PirateResult<T> = std::result::Result<T, AnyError>;

/// The failure kinds a job can terminate with. Each kind carries its own
/// local recovery policy (see `docs` on each variant) independent of which
/// component raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network blip talking to a provider or HTTP dependency. Retried with
    /// the queue's backoff-with-jitter policy.
    TransientNetwork,
    /// Provider asked us to slow down. Deferred by the provider-advised
    /// delay (or the queue's default backoff if none was given).
    RateLimited,
    /// Provider quota exhausted. Deferred with exponential backoff
    /// (1h -> 1.5x -> cap 4h).
    QuotaExceeded,
    /// Provider credentials are missing or expired. Deferred 5 minutes at a
    /// time, up to 12 attempts, with a health-endpoint flag raised.
    NotAuthenticated,
    /// HSDS candidate failed field validation. Retried with feedback text
    /// appended to the prompt up to `max_retries`, then dead-lettered.
    ValidationError,
    /// Reconciler input did not conform to the HSDS JSON Schema at all.
    /// Not retried — dead-lettered immediately.
    SchemaViolation,
    /// Reconciler location match was ambiguous between more than one
    /// canonical candidate. Not an error: resolved deterministically by the
    /// tie-break rules and counted, never dead-lettered.
    MatchAmbiguous,
    /// Coordinates were absent, `(0,0)`, or outside the continental-US box.
    /// The record is accepted with null coordinates and flagged.
    GeocodeMissing,
    /// Database, filesystem, or git operation failed. Rolled back (DB) or
    /// skipped (FS/git) for this attempt; dead-lettered if it keeps
    /// recurring.
    StorageError,
    /// Publisher's SQL-dump safety ratchet tripped. The dump and the commit
    /// for this tick are both skipped; not an error for retry purposes.
    RatchetTripped,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Stable wire name, used in structured logs and health payloads.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TransientNetwork => "transient_network",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::NotAuthenticated => "not_authenticated",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::SchemaViolation => "schema_violation",
            ErrorKind::MatchAmbiguous => "match_ambiguous",
            ErrorKind::GeocodeMissing => "geocode_missing",
            ErrorKind::StorageError => "storage_error",
            ErrorKind::RatchetTripped => "ratchet_tripped",
            ErrorKind::Internal => "internal",
        }
    }

    /// Whether a job with this failure kind should ever be retried by the
    /// queue substrate. `MatchAmbiguous` and `RatchetTripped` are not
    /// failures at all so they report `false` here too (nothing to retry).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::TransientNetwork
                | ErrorKind::RateLimited
                | ErrorKind::QuotaExceeded
                | ErrorKind::NotAuthenticated
                | ErrorKind::ValidationError
        )
    }

    /// Whether exhausting retries for this kind should land the job in the
    /// dead-letter list (as opposed to just being dropped/logged).
    pub fn dead_letters_on_exhaustion(&self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationError | ErrorKind::SchemaViolation | ErrorKind::StorageError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A structured pipeline error that survives being carried through
/// `anyhow::Error` across queue boundaries.
#[derive(Debug)]
pub struct PirateError {
    pub kind: ErrorKind,
    pub message: String,
    pub retry_after: Option<std::time::Duration>,
    pub source: Option<AnyError>,
}

impl PirateError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    pub fn with_retry_after(mut self, delay: std::time::Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    pub fn from_anyhow(err: &AnyError) -> Option<&PirateError> {
        err.downcast_ref::<PirateError>()
    }

    /// Normalize any error into a `PirateError`: keep it if it already is
    /// one (lossless), otherwise wrap it as `Internal`.
    pub fn normalize(err: AnyError) -> PirateError {
        match err.downcast::<PirateError>() {
            Ok(pirate) => pirate,
            Err(other) => PirateError::new(ErrorKind::Internal, other.to_string()).with_source(other),
        }
    }

    pub fn transient_network(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientNetwork, msg)
    }
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, msg)
    }
    pub fn quota_exceeded(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExceeded, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, msg)
    }
    pub fn schema_violation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaViolation, msg)
    }
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageError, msg)
    }
}

impl fmt::Display for PirateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PirateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Bail out of the current function with a structured [`PirateError`].
#[macro_export]
macro_rules! bail_pirate {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::PirateError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::PirateError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_existing_kind() {
        let err = PirateError::quota_exceeded("provider capped us").into_anyhow();
        let normalized = PirateError::normalize(err);
        assert_eq!(normalized.kind, ErrorKind::QuotaExceeded);
    }

    #[test]
    fn normalize_wraps_foreign_errors_as_internal() {
        let foreign = anyhow::anyhow!("boom");
        let normalized = PirateError::normalize(foreign);
        assert_eq!(normalized.kind, ErrorKind::Internal);
    }

    #[test]
    fn retryable_kinds_match_the_taxonomy() {
        assert!(ErrorKind::RateLimited.is_retryable());
        assert!(!ErrorKind::MatchAmbiguous.is_retryable());
        assert!(ErrorKind::SchemaViolation.dead_letters_on_exhaustion());
        assert!(!ErrorKind::RatchetTripped.dead_letters_on_exhaustion());
    }
}
