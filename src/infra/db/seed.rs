//! Demo data for local development.

use crate::application::repos::RepoError;
use crate::domain::types::NewsStatus;

use super::{PostgresRepositories, map_sqlx_error};

/// How much demo data to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub tags: u32,
    pub articles: u32,
    pub links: u32,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            tags: 10,
            articles: 100,
            links: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub tags: u64,
    pub articles: u64,
    pub links: u64,
}

impl SeedPlan {
    fn tag_names(&self) -> Vec<String> {
        (1..=self.tags).map(|n| format!("Topic{n}")).collect()
    }

    fn article_status(index: u32) -> NewsStatus {
        NewsStatus::ALL[index as usize % NewsStatus::ALL.len()]
    }

    /// Spreads links over articles first, shifting the tag on every pass so
    /// an article never receives the same tag twice while passes < tag count.
    fn link_pairs(&self, news_ids: &[i64], tag_ids: &[i64]) -> (Vec<i64>, Vec<i64>) {
        if news_ids.is_empty() || tag_ids.is_empty() {
            return (Vec::new(), Vec::new());
        }
        (0..self.links as usize)
            .map(|k| {
                let article = k % news_ids.len();
                let pass = k / news_ids.len();
                let tag = (article * 7 + pass) % tag_ids.len();
                (news_ids[article], tag_ids[tag])
            })
            .unzip()
    }
}

impl PostgresRepositories {
    /// Inserts `Topic1..TopicN` tags, articles with cycling statuses and
    /// article-tag links in one transaction. Existing tags are reused.
    pub async fn seed(&self, plan: SeedPlan) -> Result<SeedSummary, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;
        let mut summary = SeedSummary::default();

        let names = plan.tag_names();
        summary.tags = sqlx::query(
            r#"
            INSERT INTO tags (name)
            SELECT name FROM UNNEST($1::text[]) AS name
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(&names)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        let tag_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM tags
            WHERE name = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&names)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let capacity = plan.articles as usize;
        let mut titles = Vec::with_capacity(capacity);
        let mut bodies = Vec::with_capacity(capacity);
        let mut statuses = Vec::with_capacity(capacity);
        for n in 1..=plan.articles {
            titles.push(format!("Title {n}"));
            bodies.push(format!("Body {n}"));
            statuses.push(SeedPlan::article_status(n - 1).as_str().to_string());
        }

        let news_ids = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO news (title, body, status)
            SELECT title, body, status::news_status
            FROM UNNEST($1::text[], $2::text[], $3::text[]) AS seed(title, body, status)
            RETURNING id
            "#,
        )
        .bind(&titles)
        .bind(&bodies)
        .bind(&statuses)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        summary.articles = news_ids.len() as u64;

        let (link_news, link_tags) = plan.link_pairs(&news_ids, &tag_ids);
        summary.links = sqlx::query(
            r#"
            INSERT INTO news_tags (news_id, tag_id)
            SELECT news_id, tag_id
            FROM UNNEST($1::bigint[], $2::bigint[]) AS link(news_id, tag_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&link_news)
        .bind(&link_tags)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn default_plan_matches_demo_dataset() {
        let plan = SeedPlan::default();
        assert_eq!(plan.tag_names().first().map(String::as_str), Some("Topic1"));
        assert_eq!(plan.tag_names().last().map(String::as_str), Some("Topic10"));
        assert_eq!(plan.articles, 100);
        assert_eq!(plan.links, 300);
    }

    #[test]
    fn statuses_cycle() {
        let statuses: Vec<_> = (0..4).map(SeedPlan::article_status).collect();
        assert_eq!(
            statuses,
            vec![
                NewsStatus::Draft,
                NewsStatus::Publish,
                NewsStatus::Deleted,
                NewsStatus::Draft
            ]
        );
    }

    #[test]
    fn link_pairs_are_unique() {
        let plan = SeedPlan::default();
        let news: Vec<i64> = (1..=100).collect();
        let tags: Vec<i64> = (1..=10).collect();

        let (link_news, link_tags) = plan.link_pairs(&news, &tags);
        assert_eq!(link_news.len(), 300);

        let pairs: HashSet<_> = link_news.iter().zip(link_tags.iter()).collect();
        assert_eq!(pairs.len(), 300);
    }

    #[test]
    fn link_pairs_empty_without_targets() {
        let plan = SeedPlan::default();
        let (news, tags) = plan.link_pairs(&[], &[1, 2]);
        assert!(news.is_empty() && tags.is_empty());
    }
}
