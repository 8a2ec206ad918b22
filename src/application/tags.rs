//! Tag service: cached listing and invalidating writes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::application::cached::{CachedRead, read_through};
use crate::application::repos::{
    CreateTagParams, RepoError, TagsRepo, TagsWriteRepo, UpdateTagParams,
};
use crate::cache::{CacheTrigger, Collection, FilterSpec};
use crate::domain::entities::TagRecord;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("tag not found")]
    NotFound,
    #[error("failed to encode tag payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPayload {
    pub id: i64,
    pub name: String,
}

impl From<TagRecord> for TagPayload {
    fn from(record: TagRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTagCommand {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTagCommand {
    pub name: String,
}

/// Tag queries and mutations.
///
/// Tag mutations only invalidate the `tag` namespace. Cached news payloads
/// keep embedding the old tag name until the next news mutation.
#[derive(Clone)]
pub struct TagService {
    reader: Arc<dyn TagsRepo>,
    writer: Arc<dyn TagsWriteRepo>,
    cache: CacheTrigger,
}

impl TagService {
    pub fn new(reader: Arc<dyn TagsRepo>, writer: Arc<dyn TagsWriteRepo>, cache: CacheTrigger) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<CachedRead, TagError> {
        read_through(&self.cache, Collection::Tag, 0, FilterSpec::none(), || async {
            let records = self.reader.list_all().await?;
            Ok::<_, TagError>(records.into_iter().map(TagPayload::from).collect::<Vec<_>>())
        })
        .await
    }

    pub async fn create(&self, command: CreateTagCommand) -> Result<TagRecord, TagError> {
        let name = normalize_name(&command.name)?;
        let tag = self.writer.create_tag(CreateTagParams { name }).await?;
        self.invalidate();
        info!(tag_id = tag.id, name = %tag.name, "Tag created");
        Ok(tag)
    }

    pub async fn update(&self, id: i64, command: UpdateTagCommand) -> Result<TagRecord, TagError> {
        let name = normalize_name(&command.name)?;
        let tag = self
            .writer
            .update_tag(UpdateTagParams { id, name })
            .await
            .map_err(not_found)?;
        self.invalidate();
        info!(tag_id = tag.id, name = %tag.name, "Tag renamed");
        Ok(tag)
    }

    pub async fn delete(&self, id: i64) -> Result<(), TagError> {
        self.writer.delete_tag(id).await.map_err(not_found)?;
        self.invalidate();
        info!(tag_id = id, "Tag deleted");
        Ok(())
    }

    fn invalidate(&self) {
        drop(self.cache.invalidate(Collection::Tag));
    }
}

fn not_found(err: RepoError) -> TagError {
    match err {
        RepoError::NotFound => TagError::NotFound,
        other => TagError::Repo(other),
    }
}

fn normalize_name(name: &str) -> Result<String, TagError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TagError::ConstraintViolation("name"));
    }
    Ok(trimmed.to_string())
}
