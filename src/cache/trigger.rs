//! Cache trigger service.
//!
//! Dispatches populate and invalidate calls as detached tasks so the request
//! path never waits on the cache.

use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;

use super::coordinator::CacheCoordinator;
use super::keys::{Collection, FilterSpec};

/// Handle used by services to reach the cache.
///
/// Reads go straight through [`CacheTrigger::coordinator`]. Writes go through
/// [`CacheTrigger::populate`] and [`CacheTrigger::invalidate`], which return
/// the spawned task's handle. Callers normally drop it.
#[derive(Clone)]
pub struct CacheTrigger {
    coordinator: Arc<CacheCoordinator>,
}

impl CacheTrigger {
    pub fn new(coordinator: Arc<CacheCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &CacheCoordinator {
        &self.coordinator
    }

    /// Stores a freshly loaded payload in the background.
    pub fn populate(
        &self,
        collection: Collection,
        id: i64,
        filter: FilterSpec,
        payload: Bytes,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            coordinator.put(collection, id, &filter, payload).await;
        })
    }

    /// Drops a collection namespace in the background after a mutation.
    /// A disabled coordinator turns the task into a no-op.
    pub fn invalidate(&self, collection: Collection) -> JoinHandle<()> {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            coordinator.invalidate(collection).await;
        })
    }
}
