//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::NewsStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Article with the names of its linked tags, in tag id order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsRecord {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub status: NewsStatus,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
