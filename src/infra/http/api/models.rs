use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::application::cached::{CachedRead, DataSource};

pub const SUCCESS_MESSAGE: &str = "Successful Operation";

#[derive(Debug, Deserialize, Serialize)]
pub struct NewsCreateRequest {
    pub title: String,
    pub body: String,
    pub tags: Vec<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct NewsUpdateRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub tags: Vec<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TagRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsListQuery {
    pub status: Option<String>,
    /// Comma separated tag names.
    pub topic: Option<String>,
}

/// Envelope for read endpoints.
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub code: u16,
    pub message: &'static str,
    pub source: DataSource,
    pub data: Box<RawValue>,
}

impl From<CachedRead> for DataResponse {
    fn from(read: CachedRead) -> Self {
        Self {
            code: 200,
            message: SUCCESS_MESSAGE,
            source: read.source,
            data: read.data,
        }
    }
}

/// Envelope for mutations.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub code: u16,
    pub message: &'static str,
}

impl OperationResponse {
    pub fn ok() -> Self {
        Self {
            code: 200,
            message: SUCCESS_MESSAGE,
        }
    }
}
