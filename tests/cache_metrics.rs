use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use metrics_util::debugging::DebuggingRecorder;
use newsroom::cache::{
    CacheConfig, CacheCoordinator, CacheError, CacheStore, Collection, FilterSpec, MemoryStore,
    METRIC_CACHE_ERROR_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_INVALIDATE_TOTAL,
    METRIC_CACHE_MISS_TOTAL, METRIC_CACHE_OP_MS,
};

struct DownStore;

#[async_trait::async_trait]
impl CacheStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(
        &self,
        _key: &str,
        _value: Bytes,
        _ttl: Option<std::time::Duration>,
    ) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    fn backend(&self) -> &'static str {
        "down"
    }
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let config = CacheConfig::default();
    let healthy = CacheCoordinator::new(config.clone(), Arc::new(MemoryStore::new(&config)));
    let filter = FilterSpec::none();

    assert!(healthy.get(Collection::News, 1, &filter).await.is_none());
    healthy
        .put(Collection::News, 1, &filter, Bytes::from_static(b"{}"))
        .await;
    assert!(healthy.get(Collection::News, 1, &filter).await.is_some());
    healthy.invalidate(Collection::News).await;

    let broken = CacheCoordinator::new(config, Arc::new(DownStore));
    assert!(broken.get(Collection::Tag, 0, &filter).await.is_none());

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        METRIC_CACHE_HIT_TOTAL,
        METRIC_CACHE_MISS_TOTAL,
        METRIC_CACHE_ERROR_TOTAL,
        METRIC_CACHE_INVALIDATE_TOTAL,
        METRIC_CACHE_OP_MS,
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
