//! Read-through helper shared by the query services.

use std::future::Future;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::warn;

use crate::cache::{CacheTrigger, Collection, FilterSpec};

/// Where a read result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Database,
}

/// Serialized query result, ready to embed in a response envelope.
#[derive(Debug)]
pub struct CachedRead {
    pub data: Box<RawValue>,
    pub source: DataSource,
}

impl CachedRead {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.data.get())
    }
}

/// Serves `collection/id/filter` from the cache, or runs `load` and populates
/// the cache in the background with the exact bytes returned to the caller.
///
/// An entry that is not valid JSON is ignored and overwritten.
pub(crate) async fn read_through<T, E, F, Fut>(
    cache: &CacheTrigger,
    collection: Collection,
    id: i64,
    filter: FilterSpec,
    load: F,
) -> Result<CachedRead, E>
where
    T: Serialize,
    E: From<serde_json::Error>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(payload) = cache.coordinator().get(collection, id, &filter).await {
        match serde_json::from_slice::<Box<RawValue>>(&payload) {
            Ok(data) => {
                return Ok(CachedRead {
                    data,
                    source: DataSource::Cache,
                });
            }
            Err(err) => warn!(
                collection = %collection,
                id,
                error = %err,
                "Ignoring undecodable cache entry"
            ),
        }
    }

    let value = load().await?;
    let data = serde_json::value::to_raw_value(&value)?;
    let payload = Bytes::copy_from_slice(data.get().as_bytes());
    drop(cache.populate(collection, id, filter, payload));

    Ok(CachedRead {
        data,
        source: DataSource::Database,
    })
}
