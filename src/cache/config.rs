//! Cache configuration.
//!
//! Built from the `[cache]` section of `newsroom.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;
const DEFAULT_INVALIDATE_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
const DEFAULT_MEMORY_CAPACITY: usize = 1024;

/// Runtime cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. When off, reads always miss and writes are dropped.
    pub enabled: bool,
    /// Redis endpoint. Without it the in-process store is used.
    pub redis_url: Option<String>,
    /// Upper bound for a single get or put.
    pub operation_timeout_ms: u64,
    /// Upper bound for a whole collection invalidation. Runs off the request
    /// path, so it is much looser than `operation_timeout_ms`.
    pub invalidate_timeout_ms: u64,
    /// Upper bound for establishing the Redis connection.
    pub connect_timeout_ms: u64,
    /// Optional expiry for populated entries.
    pub ttl_seconds: Option<u64>,
    /// Entry limit of the in-process store.
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: None,
            operation_timeout_ms: DEFAULT_OPERATION_TIMEOUT_MS,
            invalidate_timeout_ms: DEFAULT_INVALIDATE_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            ttl_seconds: None,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            redis_url: settings.redis_url.clone(),
            operation_timeout_ms: settings.operation_timeout_ms,
            invalidate_timeout_ms: settings.invalidate_timeout_ms,
            connect_timeout_ms: settings.connect_timeout_ms,
            ttl_seconds: settings.ttl_seconds,
            memory_capacity: settings.memory_capacity,
        }
    }
}

impl CacheConfig {
    /// Configuration with caching switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn invalidate_timeout(&self) -> Duration {
        Duration::from_millis(self.invalidate_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Entry TTL; zero is treated as "no expiry".
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
    }

    /// Returns the memory capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
