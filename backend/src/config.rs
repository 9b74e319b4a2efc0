use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CACHE_REDIS_PREFIX: &str = "gacha:";
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_STORE_BUSY_TIMEOUT_MS: u64 = 1_000;

#[derive(Clone, Debug, Serialize)]
pub struct BackendConfig {
    /// SQLite file. An in-memory database is used when unset.
    pub database_path: Option<PathBuf>,
    /// Redis master data cache. The in-process cache is used when unset.
    pub cache_redis_url: Option<String>,
    pub cache_redis_prefix: Option<String>,
    pub cache_timeout_ms: Option<u64>,
    pub store_busy_timeout_ms: Option<u64>,
    /// Seeds the lottery RNG for reproducible draws.
    pub deterministic_seed: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            cache_redis_url: None,
            cache_redis_prefix: Some(DEFAULT_CACHE_REDIS_PREFIX.to_string()),
            cache_timeout_ms: Some(DEFAULT_CACHE_TIMEOUT_MS),
            store_busy_timeout_ms: Some(DEFAULT_STORE_BUSY_TIMEOUT_MS),
            deterministic_seed: None,
        }
    }
}

impl BackendConfig {
    pub fn cache_prefix(&self) -> String {
        self.cache_redis_prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_CACHE_REDIS_PREFIX.to_string())
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(
            self.cache_timeout_ms
                .unwrap_or(DEFAULT_CACHE_TIMEOUT_MS)
                .max(1),
        )
    }

    pub fn store_busy_timeout(&self) -> Duration {
        Duration::from_millis(
            self.store_busy_timeout_ms
                .unwrap_or(DEFAULT_STORE_BUSY_TIMEOUT_MS)
                .max(1),
        )
    }
}
