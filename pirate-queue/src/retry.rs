//! Backoff policy for `defer`. The queue substrate only knows exponential
//! backoff with jitter; the provider-specific quota/auth schedules from the
//! alignment worker (1h -> 1.5x -> 4h cap for quota exhaustion, 5-minute
//! steps up to 12 attempts for missing credentials) are expressed by the
//! worker computing its own `retry_after` and passing it to `defer`
//! directly, bypassing this default entirely.

use std::time::Duration;

use rand::Rng;

/// Default retry policy: `base * 2^attempt`, capped, with up to 20% jitter
/// so a burst of jobs that fail together don't all retry in lockstep.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            max: Duration::from_secs(300),
            max_retries: 3,
        }
    }
}

impl BackoffPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped = exp.min(self.max.as_secs_f64());

        let jitter_fraction = rand::thread_rng().gen_range(0.0..0.2);
        let jittered = capped * (1.0 + jitter_fraction);

        Duration::from_secs_f64(jittered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_attempt_and_stays_capped() {
        let policy = BackoffPolicy::default();
        let first = policy.delay_for_attempt(0);
        let third = policy.delay_for_attempt(3);
        let tenth = policy.delay_for_attempt(10);

        assert!(first < third);
        assert!(tenth.as_secs_f64() <= policy.max.as_secs_f64() * 1.2 + 1.0);
    }
}
