//! Provider-specific retry schedules the failure-semantics table in the
//! alignment contract calls for. The queue's own backoff-with-jitter
//! policy only covers `RateLimited`/`TransientNetwork`; `QuotaExceeded`
//! and `NotAuthenticated` compute their own `retry_after` here and pass it
//! to `defer` directly.

use std::time::Duration;

/// `QuotaExceeded`: 1h, then ×1.5 per further attempt, capped at 4h.
pub fn quota_retry_delay(attempt: u32, base: Duration, multiplier: f64, cap: Duration) -> Duration {
    let seconds = base.as_secs_f64() * multiplier.powi(attempt as i32);
    Duration::from_secs_f64(seconds.min(cap.as_secs_f64()))
}

/// `NotAuthenticated`: a fixed 5-minute interval, up to 12 attempts.
pub const NOT_AUTHENTICATED_RETRY_INTERVAL: Duration = Duration::from_secs(300);
pub const NOT_AUTHENTICATED_MAX_ATTEMPTS: u32 = 12;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_delay_matches_the_documented_schedule() {
        let base = Duration::from_secs(3600);
        let cap = Duration::from_secs(14_400);

        assert_eq!(quota_retry_delay(0, base, 1.5, cap).as_secs(), 3600);
        assert_eq!(quota_retry_delay(1, base, 1.5, cap).as_secs(), 5400);
        assert_eq!(quota_retry_delay(2, base, 1.5, cap).as_secs(), 8100);
    }

    #[test]
    fn quota_delay_is_capped() {
        let base = Duration::from_secs(3600);
        let cap = Duration::from_secs(14_400);
        assert_eq!(quota_retry_delay(10, base, 1.5, cap).as_secs(), 14_400);
    }
}
