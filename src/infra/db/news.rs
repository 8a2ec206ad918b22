use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{
        CreateNewsParams, NewsQueryFilter, NewsRepo, NewsWriteRepo, RepoError, UpdateNewsParams,
    },
    domain::{entities::NewsRecord, types::NewsStatus},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct NewsRow {
    id: i64,
    title: String,
    body: String,
    status: NewsStatus,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl NewsRow {
    fn into_record(self, tags: Vec<String>) -> NewsRecord {
        NewsRecord {
            id: self.id,
            title: self.title,
            body: self.body,
            status: self.status,
            tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// One row per (article, tag) pair of a listing.
#[derive(sqlx::FromRow)]
struct NewsTagRow {
    #[sqlx(flatten)]
    news: NewsRow,
    tag_name: String,
}

/// Folds join rows ordered by article id into articles with their tag names.
fn group_rows(rows: Vec<NewsTagRow>) -> Vec<NewsRecord> {
    let mut records: Vec<NewsRecord> = Vec::new();
    for row in rows {
        match records.last_mut() {
            Some(last) if last.id == row.news.id => last.tags.push(row.tag_name),
            _ => records.push(row.news.into_record(vec![row.tag_name])),
        }
    }
    records
}

async fn load_tag_names(conn: &mut PgConnection, news_id: i64) -> Result<Vec<String>, RepoError> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT t.name
        FROM tags t
        INNER JOIN news_tags nt ON nt.tag_id = t.id
        WHERE nt.news_id = $1
        ORDER BY t.id
        "#,
    )
    .bind(news_id)
    .fetch_all(conn)
    .await
    .map_err(map_sqlx_error)
}

async fn link_tags(conn: &mut PgConnection, news_id: i64, tag_ids: &[i64]) -> Result<(), RepoError> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO news_tags (news_id, tag_id)
        SELECT $1, id
        FROM UNNEST($2::bigint[]) AS id
        "#,
    )
    .bind(news_id)
    .bind(tag_ids)
    .execute(conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl NewsRepo for PostgresRepositories {
    async fn list_news(&self, filter: &NewsQueryFilter) -> Result<Vec<NewsRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT n.id, n.title, n.body, n.status, n.created_at, n.updated_at,
                   t.name AS tag_name
            FROM news n
            INNER JOIN news_tags nt ON nt.news_id = n.id
            INNER JOIN tags t ON t.id = nt.tag_id
            WHERE TRUE
            "#,
        );

        if let Some(status) = filter.status {
            qb.push(" AND n.status = ");
            qb.push_bind(status);
        }

        if !filter.tags.is_empty() {
            qb.push(" AND t.name = ANY(");
            qb.push_bind(filter.tags.clone());
            qb.push(")");
        }

        qb.push(" ORDER BY n.id, t.id");

        let rows = qb
            .build_query_as::<NewsTagRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(group_rows(rows))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<NewsRecord>, RepoError> {
        let mut conn = self.pool().acquire().await.map_err(map_sqlx_error)?;

        let Some(row) = sqlx::query_as::<_, NewsRow>(
            r#"
            SELECT id, title, body, status, created_at, updated_at
            FROM news
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?
        else {
            return Ok(None);
        };

        let tags = load_tag_names(&mut conn, id).await?;
        Ok(Some(row.into_record(tags)))
    }
}

#[async_trait]
impl NewsWriteRepo for PostgresRepositories {
    async fn create_news(&self, params: CreateNewsParams) -> Result<NewsRecord, RepoError> {
        let CreateNewsParams {
            title,
            body,
            status,
            tag_ids,
        } = params;

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, NewsRow>(
            r#"
            INSERT INTO news (title, body, status)
            VALUES ($1, $2, $3)
            RETURNING id, title, body, status, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(body)
        .bind(status)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        link_tags(&mut tx, row.id, &tag_ids).await?;
        let tags = load_tag_names(&mut tx, row.id).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into_record(tags))
    }

    async fn update_news(&self, params: UpdateNewsParams) -> Result<NewsRecord, RepoError> {
        let UpdateNewsParams {
            id,
            title,
            body,
            tag_ids,
        } = params;

        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, NewsRow>(
            r#"
            UPDATE news
            SET title = COALESCE($2, title),
                body = COALESCE($3, body),
                updated_at = now()
            WHERE id = $1
            RETURNING id, title, body, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(body)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        sqlx::query(
            r#"
            DELETE FROM news_tags
            WHERE news_id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        link_tags(&mut tx, id, &tag_ids).await?;
        let tags = load_tag_names(&mut tx, id).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into_record(tags))
    }

    async fn update_news_status(
        &self,
        id: i64,
        status: NewsStatus,
    ) -> Result<NewsRecord, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, NewsRow>(
            r#"
            UPDATE news
            SET status = $2,
                updated_at = now()
            WHERE id = $1
            RETURNING id, title, body, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        let tags = load_tag_names(&mut tx, id).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into_record(tags))
    }

    async fn delete_news(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            DELETE FROM news
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
