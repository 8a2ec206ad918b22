//! Cache-aside coordinator.
//!
//! Wraps a [`CacheStore`] with key encoding, per-call timeouts and the
//! fail-open policy: store failures are logged and counted, then treated as
//! a miss (reads) or dropped (writes and invalidations).

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};

use super::config::CacheConfig;
use super::keys::{CacheKey, Collection, FilterSpec};
use super::store::{CacheError, CacheStore, MemoryStore};

pub const METRIC_CACHE_HIT_TOTAL: &str = "newsroom_cache_hit_total";
pub const METRIC_CACHE_MISS_TOTAL: &str = "newsroom_cache_miss_total";
pub const METRIC_CACHE_ERROR_TOTAL: &str = "newsroom_cache_error_total";
pub const METRIC_CACHE_INVALIDATE_TOTAL: &str = "newsroom_cache_invalidate_total";
pub const METRIC_CACHE_OP_MS: &str = "newsroom_cache_op_ms";

pub struct CacheCoordinator {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
}

impl CacheCoordinator {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self { config, store }
    }

    /// Coordinator that never hits and never writes.
    pub fn disabled() -> Self {
        let config = CacheConfig::disabled();
        let store = Arc::new(MemoryStore::new(&config));
        Self { config, store }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Looks up a cached payload. Any store failure reads as a miss.
    #[instrument(skip(self, filter), fields(collection = %collection))]
    pub async fn get(&self, collection: Collection, id: i64, filter: &FilterSpec) -> Option<Bytes> {
        if !self.is_enabled() {
            return None;
        }

        let key = CacheKey::encode(collection, id, filter);
        match self.call("get", self.config.operation_timeout(), self.store.get(key.as_str())).await {
            Ok(Some(payload)) => {
                counter!(METRIC_CACHE_HIT_TOTAL, "collection" => collection.as_str()).increment(1);
                debug!(key = %key, bytes = payload.len(), "Cache hit");
                Some(payload)
            }
            Ok(None) => {
                counter!(METRIC_CACHE_MISS_TOTAL, "collection" => collection.as_str()).increment(1);
                debug!(key = %key, "Cache miss");
                None
            }
            Err(err) => {
                self.report("get", key.as_str(), &err);
                None
            }
        }
    }

    /// Stores a payload under the encoded key, honoring the configured TTL.
    #[instrument(skip(self, filter, payload), fields(collection = %collection, bytes = payload.len()))]
    pub async fn put(&self, collection: Collection, id: i64, filter: &FilterSpec, payload: Bytes) {
        if !self.is_enabled() {
            return;
        }

        let key = CacheKey::encode(collection, id, filter);
        let ttl = self.config.ttl();
        let set = self.store.set(key.as_str(), payload, ttl);
        match self.call("put", self.config.operation_timeout(), set).await {
            Ok(()) => debug!(key = %key, ttl_secs = ttl.map(|ttl| ttl.as_secs()), "Cache populated"),
            Err(err) => self.report("put", key.as_str(), &err),
        }
    }

    /// Drops every entry of `collection`.
    ///
    /// Bounded by `invalidate_timeout` rather than the read timeout: an
    /// abandoned scan leaves the rest of the namespace stale.
    #[instrument(skip(self), fields(collection = %collection))]
    pub async fn invalidate(&self, collection: Collection) {
        if !self.is_enabled() {
            return;
        }

        let prefix = collection.prefix();
        let delete = self.store.delete_prefix(&prefix);
        match self
            .call("invalidate", self.config.invalidate_timeout(), delete)
            .await
        {
            Ok(removed) => {
                counter!(METRIC_CACHE_INVALIDATE_TOTAL, "collection" => collection.as_str())
                    .increment(1);
                info!(prefix = %prefix, removed, "Cache collection invalidated");
            }
            Err(err) => self.report("invalidate", &prefix, &err),
        }
    }

    async fn call<T, F>(&self, op: &'static str, limit: Duration, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        let started_at = Instant::now();
        let result = match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout { op }),
        };
        histogram!(METRIC_CACHE_OP_MS, "op" => op)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }

    fn report(&self, op: &'static str, key: &str, err: &CacheError) {
        counter!(METRIC_CACHE_ERROR_TOTAL, "op" => op, "reason" => err.kind()).increment(1);
        warn!(
            op,
            key,
            backend = self.store.backend(),
            reason = err.kind(),
            error = %err,
            "Cache store call failed, continuing without cache"
        );
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Option<Duration>) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    struct StalledStore;

    #[async_trait]
    impl CacheStore for StalledStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some(Bytes::from_static(b"late")))
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Option<Duration>) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(0)
        }

        fn backend(&self) -> &'static str {
            "stalled"
        }
    }

    struct SlowScanStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl CacheStore for SlowScanStore {
        async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError> {
            self.inner.set(key, value, ttl).await
        }

        async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            self.inner.delete_prefix(prefix).await
        }

        fn backend(&self) -> &'static str {
            "slow-scan"
        }
    }

    fn memory_coordinator() -> (CacheCoordinator, Arc<MemoryStore>) {
        let config = CacheConfig::default();
        let store = Arc::new(MemoryStore::new(&config));
        (CacheCoordinator::new(config, store.clone()), store)
    }

    #[tokio::test]
    async fn put_then_get_returns_payload() {
        let (coordinator, store) = memory_coordinator();
        let filter = FilterSpec::new(Some("draft"), [""]);

        coordinator
            .put(Collection::News, 0, &filter, Bytes::from_static(b"[]"))
            .await;

        assert!(store.contains("news:0:draft:"));
        assert_eq!(
            coordinator.get(Collection::News, 0, &filter).await,
            Some(Bytes::from_static(b"[]"))
        );
    }

    #[tokio::test]
    async fn disabled_coordinator_never_touches_store() {
        let config = CacheConfig::disabled();
        let store = Arc::new(MemoryStore::new(&config));
        let coordinator = CacheCoordinator::new(config, store.clone());

        coordinator
            .put(Collection::Tag, 0, &FilterSpec::none(), Bytes::from_static(b"[]"))
            .await;
        assert!(store.is_empty());
        assert!(
            coordinator
                .get(Collection::Tag, 0, &FilterSpec::none())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn store_errors_fail_open() {
        let coordinator = CacheCoordinator::new(CacheConfig::default(), Arc::new(BrokenStore));

        assert!(
            coordinator
                .get(Collection::News, 1, &FilterSpec::none())
                .await
                .is_none()
        );
        coordinator
            .put(Collection::News, 1, &FilterSpec::none(), Bytes::from_static(b"{}"))
            .await;
        coordinator.invalidate(Collection::News).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_is_cut_off_by_timeout() {
        let coordinator = CacheCoordinator::new(CacheConfig::default(), Arc::new(StalledStore));

        let started = tokio::time::Instant::now();
        assert!(
            coordinator
                .get(Collection::News, 0, &FilterSpec::none())
                .await
                .is_none()
        );
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_invalidation_outlasts_read_timeout() {
        let config = CacheConfig::default();
        let store = Arc::new(SlowScanStore {
            inner: MemoryStore::new(&config),
        });
        let coordinator = CacheCoordinator::new(config, store);
        let filter = FilterSpec::none();

        coordinator
            .put(Collection::News, 1, &filter, Bytes::from_static(b"old"))
            .await;
        coordinator.invalidate(Collection::News).await;

        assert!(coordinator.get(Collection::News, 1, &filter).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_past_its_own_bound_is_abandoned() {
        let config = CacheConfig {
            invalidate_timeout_ms: 250,
            ..Default::default()
        };
        let store = Arc::new(SlowScanStore {
            inner: MemoryStore::new(&config),
        });
        let coordinator = CacheCoordinator::new(config, store);
        let filter = FilterSpec::none();

        coordinator
            .put(Collection::News, 1, &filter, Bytes::from_static(b"old"))
            .await;
        coordinator.invalidate(Collection::News).await;

        assert!(coordinator.get(Collection::News, 1, &filter).await.is_some());
    }
}
