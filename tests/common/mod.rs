#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;

use newsroom::application::news::NewsService;
use newsroom::application::repos::{
    CreateNewsParams, CreateTagParams, HealthRepo, NewsQueryFilter, NewsRepo, NewsWriteRepo,
    RepoError, TagsRepo, TagsWriteRepo, UpdateNewsParams, UpdateTagParams,
};
use newsroom::application::tags::TagService;
use newsroom::cache::{
    CacheConfig, CacheCoordinator, CacheError, CacheStore, CacheTrigger, MemoryStore,
};
use newsroom::domain::entities::{NewsRecord, TagRecord};
use newsroom::domain::types::NewsStatus;
use newsroom::infra::http::ApiState;

struct StoredNews {
    title: String,
    body: String,
    status: NewsStatus,
}

#[derive(Default)]
struct State {
    news: BTreeMap<i64, StoredNews>,
    tags: BTreeMap<i64, String>,
    links: BTreeSet<(i64, i64)>,
    next_news_id: i64,
    next_tag_id: i64,
}

impl State {
    fn tag_names(&self, news_id: i64, only: &[String]) -> Vec<String> {
        self.links
            .iter()
            .filter(|(news, _)| *news == news_id)
            .filter_map(|(_, tag)| self.tags.get(tag))
            .filter(|name| only.is_empty() || only.contains(name))
            .cloned()
            .collect()
    }

    fn record(&self, id: i64, tags: Vec<String>) -> Option<NewsRecord> {
        self.news.get(&id).map(|news| NewsRecord {
            id,
            title: news.title.clone(),
            body: news.body.clone(),
            status: news.status,
            tags,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        })
    }

    fn check_tags(&self, tag_ids: &[i64]) -> Result<(), RepoError> {
        match tag_ids.iter().find(|id| !self.tags.contains_key(id)) {
            Some(id) => Err(RepoError::InvalidInput {
                message: format!("tag {id} does not exist"),
            }),
            None => Ok(()),
        }
    }
}

/// Source of record kept in memory, counting the loads served.
#[derive(Default)]
pub struct InMemoryRepos {
    state: Mutex<State>,
    news_loads: AtomicUsize,
    tag_loads: AtomicUsize,
    unhealthy: AtomicBool,
}

impl InMemoryRepos {
    pub fn news_loads(&self) -> usize {
        self.news_loads.load(Ordering::SeqCst)
    }

    pub fn tag_loads(&self) -> usize {
        self.tag_loads.load(Ordering::SeqCst)
    }

    pub fn set_unhealthy(&self) {
        self.unhealthy.store(true, Ordering::SeqCst);
    }

    pub fn insert_tag(&self, name: &str) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_tag_id += 1;
        let id = state.next_tag_id;
        state.tags.insert(id, name.to_string());
        id
    }

    pub fn insert_news(&self, title: &str, status: NewsStatus, tag_ids: &[i64]) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_news_id += 1;
        let id = state.next_news_id;
        state.news.insert(
            id,
            StoredNews {
                title: title.to_string(),
                body: format!("{title} body"),
                status,
            },
        );
        for tag in tag_ids {
            state.links.insert((id, *tag));
        }
        id
    }
}

#[async_trait]
impl NewsRepo for InMemoryRepos {
    async fn list_news(&self, filter: &NewsQueryFilter) -> Result<Vec<NewsRecord>, RepoError> {
        self.news_loads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state
            .news
            .iter()
            .filter(|(_, news)| filter.status.is_none_or(|status| news.status == status))
            .filter_map(|(id, _)| {
                let tags = state.tag_names(*id, &filter.tags);
                if tags.is_empty() {
                    None
                } else {
                    state.record(*id, tags)
                }
            })
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<NewsRecord>, RepoError> {
        self.news_loads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state.record(id, state.tag_names(id, &[])))
    }
}

#[async_trait]
impl NewsWriteRepo for InMemoryRepos {
    async fn create_news(&self, params: CreateNewsParams) -> Result<NewsRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        state.check_tags(&params.tag_ids)?;
        state.next_news_id += 1;
        let id = state.next_news_id;
        state.news.insert(
            id,
            StoredNews {
                title: params.title,
                body: params.body,
                status: params.status,
            },
        );
        for tag in params.tag_ids {
            state.links.insert((id, tag));
        }
        state
            .record(id, state.tag_names(id, &[]))
            .ok_or(RepoError::NotFound)
    }

    async fn update_news(&self, params: UpdateNewsParams) -> Result<NewsRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        state.check_tags(&params.tag_ids)?;
        let news = state.news.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        if let Some(title) = params.title {
            news.title = title;
        }
        if let Some(body) = params.body {
            news.body = body;
        }
        state.links.retain(|(news, _)| *news != params.id);
        for tag in params.tag_ids {
            state.links.insert((params.id, tag));
        }
        state
            .record(params.id, state.tag_names(params.id, &[]))
            .ok_or(RepoError::NotFound)
    }

    async fn update_news_status(
        &self,
        id: i64,
        status: NewsStatus,
    ) -> Result<NewsRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        state.news.get_mut(&id).ok_or(RepoError::NotFound)?.status = status;
        state
            .record(id, state.tag_names(id, &[]))
            .ok_or(RepoError::NotFound)
    }

    async fn delete_news(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state.news.remove(&id).ok_or(RepoError::NotFound)?;
        state.links.retain(|(news, _)| *news != id);
        Ok(())
    }
}

#[async_trait]
impl TagsRepo for InMemoryRepos {
    async fn list_all(&self) -> Result<Vec<TagRecord>, RepoError> {
        self.tag_loads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state
            .tags
            .iter()
            .map(|(id, name)| tag_record(*id, name))
            .collect())
    }
}

#[async_trait]
impl TagsWriteRepo for InMemoryRepos {
    async fn create_tag(&self, params: CreateTagParams) -> Result<TagRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        if state.tags.values().any(|name| *name == params.name) {
            return Err(RepoError::Duplicate {
                constraint: "tags_name_key".to_string(),
            });
        }
        state.next_tag_id += 1;
        let id = state.next_tag_id;
        state.tags.insert(id, params.name.clone());
        Ok(tag_record(id, &params.name))
    }

    async fn update_tag(&self, params: UpdateTagParams) -> Result<TagRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let name = state.tags.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        *name = params.name.clone();
        Ok(tag_record(params.id, &params.name))
    }

    async fn delete_tag(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().unwrap();
        state.tags.remove(&id).ok_or(RepoError::NotFound)?;
        state.links.retain(|(_, tag)| *tag != id);
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for InMemoryRepos {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("connection refused".to_string()));
        }
        Ok(())
    }
}

fn tag_record(id: i64, name: &str) -> TagRecord {
    TagRecord {
        id,
        name: name.to_string(),
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

/// Memory store that can be switched off to simulate an unreachable backend.
pub struct FlakyStore {
    inner: MemoryStore,
    online: AtomicBool,
}

impl FlakyStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: MemoryStore::new(config),
            online: AtomicBool::new(true),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::unavailable("connection refused"))
        }
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        self.check()?;
        self.inner.delete_prefix(prefix).await
    }

    fn backend(&self) -> &'static str {
        "flaky"
    }
}

pub struct Harness {
    pub repos: Arc<InMemoryRepos>,
    pub store: Arc<FlakyStore>,
    pub cache: CacheTrigger,
    pub state: ApiState,
}

pub fn harness() -> Harness {
    let config = CacheConfig::default();
    let store = Arc::new(FlakyStore::new(&config));
    let coordinator = CacheCoordinator::new(config, store.clone());
    harness_with(Arc::new(coordinator), store)
}

pub fn harness_with(coordinator: Arc<CacheCoordinator>, store: Arc<FlakyStore>) -> Harness {
    let repos = Arc::new(InMemoryRepos::default());
    let cache = CacheTrigger::new(coordinator);
    let state = ApiState {
        news: Arc::new(NewsService::new(repos.clone(), repos.clone(), cache.clone())),
        tags: Arc::new(TagService::new(repos.clone(), repos.clone(), cache.clone())),
        health: repos.clone(),
    };
    Harness {
        repos,
        store,
        cache,
        state,
    }
}

/// Polls `check` until it holds; background cache tasks finish within a few yields.
pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
