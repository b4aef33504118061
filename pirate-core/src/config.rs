//! # Configuration
//!
//! Pantry Pirate Radio has no TOML/YAML config file: every tunable is an
//! environment variable, loaded once at process start and treated as
//! immutable afterwards (the config snapshot and the Redis/DB pools are the
//! only module-level state in the pipeline; both are owned by a worker's
//! lifecycle and never mutated mid-run).
//!
//! This mirrors the key/value `app.set()`/`app.get()` style config store
//! DogRS core used, but specialized to the concrete set of keys the
//! pipeline recognizes instead of a free-form string map, so a typo in an
//! env var name fails fast instead of silently being ignored.

use std::collections::HashMap;
use std::time::Duration;

/// Immutable, process-wide configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct PirateConfig {
    pub redis_url: String,
    pub redis_pool_size: usize,
    pub redis_ttl_seconds: u64,

    pub database_url: String,

    pub worker_count: usize,
    pub llm_worker_count: usize,

    pub llm_provider: String,

    pub claude_quota_retry_delay: Duration,
    pub claude_quota_max_delay: Duration,
    pub claude_quota_backoff_multiplier: f64,

    pub content_store_path: Option<String>,
    pub content_store_enabled: bool,

    pub publisher_check_interval: Duration,
    pub days_to_sync: i64,
    pub publisher_push_enabled: bool,

    pub sql_dump_min_records: i64,
    pub sql_dump_ratchet_percentage: f64,
    pub allow_empty_sql_dump: bool,

    pub db_init_days_to_sync: i64,
    pub skip_db_init: bool,

    /// Values that did not map to a recognized key, kept around so
    /// scraper-specific or provider-specific env vars (API keys, etc.)
    /// are still reachable without widening this struct per integration.
    extra: HashMap<String, String>,
}

impl PirateConfig {
    /// Load configuration from `std::env`, recognizing the keys documented
    /// in the pipeline's environment-configuration reference. Unset keys
    /// fall back to the documented default.
    pub fn from_env() -> Self {
        Self::from_source(std::env::vars().collect())
    }

    /// Build configuration from an explicit key/value map. Exposed for
    /// tests so they don't need to mutate real process environment.
    pub fn from_source(mut source: HashMap<String, String>) -> Self {
        let redis_pool_size = source
            .remove("REDIS_POOL_SIZE")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10)
            .min(50);

        let content_store_path = source.remove("CONTENT_STORE_PATH");
        let content_store_enabled = source
            .remove("CONTENT_STORE_ENABLED")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| content_store_path.is_some());

        let mut cfg = Self {
            redis_url: source
                .remove("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            redis_pool_size,
            redis_ttl_seconds: parse_or(&mut source, "REDIS_TTL_SECONDS", 2_592_000),

            database_url: source
                .remove("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/pantry_pirate_radio".to_string()),

            worker_count: parse_or(&mut source, "WORKER_COUNT", 1usize),
            llm_worker_count: parse_or(&mut source, "LLM_WORKER_COUNT", 1usize),

            llm_provider: source.remove("LLM_PROVIDER").unwrap_or_else(|| "openai".to_string()),

            claude_quota_retry_delay: Duration::from_secs(parse_or(
                &mut source,
                "CLAUDE_QUOTA_RETRY_DELAY",
                3600,
            )),
            claude_quota_max_delay: Duration::from_secs(parse_or(
                &mut source,
                "CLAUDE_QUOTA_MAX_DELAY",
                14_400,
            )),
            claude_quota_backoff_multiplier: parse_or(
                &mut source,
                "CLAUDE_QUOTA_BACKOFF_MULTIPLIER",
                1.5,
            ),

            content_store_path,
            content_store_enabled,

            publisher_check_interval: Duration::from_secs(parse_or(
                &mut source,
                "PUBLISHER_CHECK_INTERVAL",
                300,
            )),
            days_to_sync: parse_or(&mut source, "DAYS_TO_SYNC", 7),
            publisher_push_enabled: parse_or(&mut source, "PUBLISHER_PUSH_ENABLED", false),

            sql_dump_min_records: parse_or(&mut source, "SQL_DUMP_MIN_RECORDS", 100),
            sql_dump_ratchet_percentage: parse_or(
                &mut source,
                "SQL_DUMP_RATCHET_PERCENTAGE",
                0.9,
            ),
            allow_empty_sql_dump: parse_or(&mut source, "ALLOW_EMPTY_SQL_DUMP", false),

            db_init_days_to_sync: parse_or(&mut source, "DB_INIT_DAYS_TO_SYNC", 90),
            skip_db_init: parse_or(&mut source, "SKIP_DB_INIT", false),

            extra: HashMap::new(),
        };

        cfg.extra = source;
        cfg
    }

    /// Read a scraper- or provider-specific key that isn't part of the
    /// recognized set (e.g. provider API keys).
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(|s| s.as_str())
    }
}

fn parse_or<T: std::str::FromStr>(source: &mut HashMap<String, String>, key: &str, default: T) -> T {
    source
        .remove(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = PirateConfig::from_source(HashMap::new());
        assert_eq!(cfg.redis_pool_size, 10);
        assert_eq!(cfg.redis_ttl_seconds, 2_592_000);
        assert_eq!(cfg.days_to_sync, 7);
        assert!(!cfg.publisher_push_enabled);
        assert_eq!(cfg.sql_dump_min_records, 100);
        assert!((cfg.sql_dump_ratchet_percentage - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn pool_size_is_capped_at_fifty() {
        let cfg = PirateConfig::from_source(source(&[("REDIS_POOL_SIZE", "500")]));
        assert_eq!(cfg.redis_pool_size, 50);
    }

    #[test]
    fn content_store_enabled_defaults_to_path_presence() {
        let cfg = PirateConfig::from_source(source(&[("CONTENT_STORE_PATH", "/data/content")]));
        assert!(cfg.content_store_enabled);

        let cfg = PirateConfig::from_source(HashMap::new());
        assert!(!cfg.content_store_enabled);
    }

    #[test]
    fn unrecognized_keys_remain_reachable_as_extras() {
        let cfg = PirateConfig::from_source(source(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(cfg.extra("OPENAI_API_KEY"), Some("sk-test"));
    }
}
