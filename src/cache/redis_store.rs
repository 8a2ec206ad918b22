//! Redis-backed cache store.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::OnceCell;
use tracing::info;

use super::config::CacheConfig;
use super::store::{CacheError, CacheStore};

const SCAN_BATCH: usize = 100;

/// Store talking to a Redis server through a shared, auto-reconnecting
/// connection.
///
/// The connection is established on first use and retried on later calls
/// until it succeeds, so a Redis that is down at startup only means misses
/// until it comes back.
pub struct RedisStore {
    client: Client,
    connect_timeout: Duration,
    connection: OnceCell<ConnectionManager>,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("connected", &self.is_connected())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl RedisStore {
    /// Builds the store without touching the network. Only a malformed URL
    /// is an error here.
    pub fn new(url: &str, config: &CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(url)
            .map_err(|err| CacheError::backend(format!("invalid redis url: {err}")))?;

        Ok(Self {
            client,
            connect_timeout: config.connect_timeout(),
            connection: OnceCell::new(),
        })
    }

    /// Builds the store and connects right away.
    pub async fn connect(url: &str, config: &CacheConfig) -> Result<Self, CacheError> {
        let store = Self::new(url, config)?;
        store.connect_now().await?;
        Ok(store)
    }

    /// Establishes the connection if it is not up yet. A failure leaves the
    /// store usable; the next call tries again.
    pub async fn connect_now(&self) -> Result<(), CacheError> {
        self.connection().await.map(drop)
    }

    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let manager = tokio::time::timeout(
                    self.connect_timeout,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                .map_err(|_| CacheError::Timeout { op: "connect" })?
                .map_err(|err| CacheError::unavailable(err.to_string()))?;

                info!(
                    target = "newsroom::cache::redis",
                    timeout_ms = self.connect_timeout.as_millis() as u64,
                    "Connected to redis cache"
                );
                Ok::<_, CacheError>(manager)
            })
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let payload = value.as_ref();
        match ttl {
            Some(ttl) => {
                let seconds = ttl.as_secs().max(1);
                let _: () = conn
                    .set_ex(key, payload, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                let _: () = conn.set(key, payload).await.map_err(map_redis_error)?;
            }
        }
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", escape_glob(prefix));

        let mut cursor = 0u64;
        let mut removed = 0usize;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;

            if !keys.is_empty() {
                let deleted: usize = conn.del(&keys).await.map_err(map_redis_error)?;
                removed += deleted;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

fn map_redis_error(err: RedisError) -> CacheError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::unavailable(err.to_string())
    } else {
        CacheError::backend(err.to_string())
    }
}

/// Escapes glob metacharacters so the prefix matches literally in `SCAN MATCH`.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
