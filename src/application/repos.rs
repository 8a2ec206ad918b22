//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{NewsRecord, TagRecord};
use crate::domain::types::NewsStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Listing filter for articles.
///
/// `tags` restricts both which articles are returned (at least one matching
/// tag) and which tag names are embedded in each article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsQueryFilter {
    pub status: Option<NewsStatus>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CreateNewsParams {
    pub title: String,
    pub body: String,
    pub status: NewsStatus,
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct UpdateNewsParams {
    pub id: i64,
    pub title: Option<String>,
    pub body: Option<String>,
    /// Replaces the article's tag links.
    pub tag_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct CreateTagParams {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct UpdateTagParams {
    pub id: i64,
    pub name: String,
}

#[async_trait]
pub trait NewsRepo: Send + Sync {
    /// Articles carrying at least one matching tag, ordered by id.
    async fn list_news(&self, filter: &NewsQueryFilter) -> Result<Vec<NewsRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<NewsRecord>, RepoError>;
}

#[async_trait]
pub trait NewsWriteRepo: Send + Sync {
    async fn create_news(&self, params: CreateNewsParams) -> Result<NewsRecord, RepoError>;

    async fn update_news(&self, params: UpdateNewsParams) -> Result<NewsRecord, RepoError>;

    async fn update_news_status(
        &self,
        id: i64,
        status: NewsStatus,
    ) -> Result<NewsRecord, RepoError>;

    async fn delete_news(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TagsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<TagRecord>, RepoError>;
}

#[async_trait]
pub trait TagsWriteRepo: Send + Sync {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError>;

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError>;

    async fn delete_tag(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
