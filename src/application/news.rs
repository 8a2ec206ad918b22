//! News article service: cached reads and invalidating writes.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::application::cached::{CachedRead, read_through};
use crate::application::repos::{
    CreateNewsParams, NewsQueryFilter, NewsRepo, NewsWriteRepo, RepoError, UpdateNewsParams,
};
use crate::cache::{CacheTrigger, Collection, FilterSpec};
use crate::domain::entities::NewsRecord;
use crate::domain::types::NewsStatus;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("news article not found")]
    NotFound,
    #[error("failed to encode news payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Article as returned to API clients and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsPayload {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub status: NewsStatus,
    pub tags: Vec<String>,
}

impl From<NewsRecord> for NewsPayload {
    fn from(record: NewsRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            body: record.body,
            status: record.status,
            tags: record.tags,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateNewsCommand {
    pub title: String,
    pub body: String,
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct UpdateNewsCommand {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag_ids: Vec<i64>,
}

impl NewsQueryFilter {
    /// Builds a filter from raw query values; empty tag names are dropped.
    pub fn new<I, T>(status: Option<NewsStatus>, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tags = tags
            .into_iter()
            .map(Into::into)
            .map(|name: String| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Self { status, tags }
    }

    pub fn cache_filter(&self) -> FilterSpec {
        FilterSpec::new(self.status.map(NewsStatus::as_str), self.tags.iter().cloned())
    }
}

#[derive(Clone)]
pub struct NewsService {
    reader: Arc<dyn NewsRepo>,
    writer: Arc<dyn NewsWriteRepo>,
    cache: CacheTrigger,
}

impl NewsService {
    pub fn new(reader: Arc<dyn NewsRepo>, writer: Arc<dyn NewsWriteRepo>, cache: CacheTrigger) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: &NewsQueryFilter) -> Result<CachedRead, NewsError> {
        read_through(&self.cache, Collection::News, 0, filter.cache_filter(), || async {
            let records = self.reader.list_news(filter).await?;
            Ok::<_, NewsError>(records.into_iter().map(NewsPayload::from).collect::<Vec<_>>())
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn find(&self, id: i64) -> Result<CachedRead, NewsError> {
        read_through(&self.cache, Collection::News, id, FilterSpec::none(), || async {
            let record = self.reader.find_by_id(id).await?.ok_or(NewsError::NotFound)?;
            Ok::<_, NewsError>(NewsPayload::from(record))
        })
        .await
    }

    pub async fn create(&self, command: CreateNewsCommand) -> Result<NewsRecord, NewsError> {
        let title = required(command.title, "title")?;
        let body = required(command.body, "body")?;

        let params = CreateNewsParams {
            title,
            body,
            status: NewsStatus::default(),
            tag_ids: dedup_ids(command.tag_ids),
        };

        let record = self.writer.create_news(params).await?;
        self.invalidate();
        info!(news_id = record.id, tags = record.tags.len(), "News article created");
        Ok(record)
    }

    pub async fn update(&self, id: i64, command: UpdateNewsCommand) -> Result<NewsRecord, NewsError> {
        let params = UpdateNewsParams {
            id,
            title: optional(command.title),
            body: optional(command.body),
            tag_ids: dedup_ids(command.tag_ids),
        };

        let record = self.writer.update_news(params).await.map_err(not_found)?;
        self.invalidate();
        info!(news_id = record.id, "News article updated");
        Ok(record)
    }

    pub async fn set_status(&self, id: i64, status: NewsStatus) -> Result<NewsRecord, NewsError> {
        let record = self
            .writer
            .update_news_status(id, status)
            .await
            .map_err(not_found)?;
        self.invalidate();
        info!(news_id = record.id, status = %status, "News status changed");
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> Result<(), NewsError> {
        self.writer.delete_news(id).await.map_err(not_found)?;
        self.invalidate();
        info!(news_id = id, "News article deleted");
        Ok(())
    }

    fn invalidate(&self) {
        drop(self.cache.invalidate(Collection::News));
    }
}

fn not_found(err: RepoError) -> NewsError {
    match err {
        RepoError::NotFound => NewsError::NotFound,
        other => NewsError::Repo(other),
    }
}

fn required(value: String, field: &'static str) -> Result<String, NewsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NewsError::ConstraintViolation(field));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn dedup_ids(ids: Vec<i64>) -> Vec<i64> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}
