//! News handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use crate::application::news::{CreateNewsCommand, UpdateNewsCommand};
use crate::application::repos::NewsQueryFilter;
use crate::domain::error::DomainError;
use crate::domain::types::NewsStatus;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

fn parse_status(raw: Option<&str>) -> Result<Option<NewsStatus>, ApiError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|err: DomainError| ApiError::bad_request(err.to_string())),
    }
}

pub async fn list_news(
    State(state): State<ApiState>,
    query: Result<Query<NewsListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let status = parse_status(query.status.as_deref())?;
    let topics = query.topic.unwrap_or_default();
    let filter = NewsQueryFilter::new(status, topics.split(','));

    let read = state.news.list(&filter).await?;
    Ok(Json(DataResponse::from(read)))
}

pub async fn get_news(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let read = state.news.find(id).await?;
    Ok(Json(DataResponse::from(read)))
}

pub async fn create_news(
    State(state): State<ApiState>,
    payload: Result<Json<NewsCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let command = CreateNewsCommand {
        title: payload.title,
        body: payload.body,
        tag_ids: payload.tags,
    };

    state.news.create(command).await?;
    Ok(Json(OperationResponse::ok()))
}

pub async fn update_news(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NewsUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let command = UpdateNewsCommand {
        title: payload.title,
        body: payload.body,
        tag_ids: payload.tags,
    };

    state.news.update(id, command).await?;
    Ok(Json(OperationResponse::ok()))
}

async fn change_status(
    state: ApiState,
    id: Result<Path<i64>, PathRejection>,
    status: NewsStatus,
) -> Result<Json<OperationResponse>, ApiError> {
    let Path(id) = id?;
    state.news.set_status(id, status).await?;
    Ok(Json(OperationResponse::ok()))
}

pub async fn publish_news(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    change_status(state, id, NewsStatus::Publish).await
}

pub async fn draft_news(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    change_status(state, id, NewsStatus::Draft).await
}

pub async fn mark_news_deleted(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    change_status(state, id, NewsStatus::Deleted).await
}

pub async fn delete_news(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    state.news.delete(id).await?;
    Ok(Json(OperationResponse::ok()))
}
