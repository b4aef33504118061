use serde::{Deserialize, Serialize};

/// Explicit feature detection for a backend, reported at the health
/// endpoint so operators can tell a memory-backed dev instance from a
/// Redis-backed production one at a glance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCapabilities {
    pub deferred_retry: bool,
    pub lease_expiry_requeue: bool,
    pub dead_letter_queue: bool,
    pub durable: bool,
}

impl QueueCapabilities {
    pub fn memory() -> Self {
        Self {
            deferred_retry: true,
            lease_expiry_requeue: true,
            dead_letter_queue: true,
            durable: false,
        }
    }

    pub fn redis() -> Self {
        Self {
            deferred_retry: true,
            lease_expiry_requeue: true,
            dead_letter_queue: true,
            durable: true,
        }
    }
}
