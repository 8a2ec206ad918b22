//! Newsroom cache-aside layer
//!
//! Query results are cached as the serialized JSON of the response `data`
//! field under keys derived from {collection, id, filter}:
//!
//! - Reads look up the key first and fall back to the database on a miss,
//!   populating the cache in the background.
//! - Mutations invalidate their whole collection namespace in the background.
//! - Store failures never fail a request: reads miss, writes are dropped.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! redis_url = "redis://127.0.0.1:6379/0"  # omit for the in-process store
//! operation_timeout_ms = 250
//! invalidate_timeout_ms = 30000
//! # ttl_seconds = 600
//! ```

mod config;
mod coordinator;
mod keys;
mod lock;
mod redis_store;
mod store;
mod trigger;

pub use config::CacheConfig;
pub use coordinator::{
    CacheCoordinator, METRIC_CACHE_ERROR_TOTAL, METRIC_CACHE_HIT_TOTAL,
    METRIC_CACHE_INVALIDATE_TOTAL, METRIC_CACHE_MISS_TOTAL, METRIC_CACHE_OP_MS,
};
pub use keys::{CacheKey, Collection, FilterSpec};
pub use redis_store::RedisStore;
pub use store::{CacheError, CacheStore, MemoryStore};
pub use trigger::CacheTrigger;
