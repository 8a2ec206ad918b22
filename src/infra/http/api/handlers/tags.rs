//! Tags handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::application::tags::{CreateTagCommand, UpdateTagCommand};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn list_tags(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let read = state.tags.list().await?;
    Ok(Json(DataResponse::from(read)))
}

pub async fn create_tag(
    State(state): State<ApiState>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    state
        .tags
        .create(CreateTagCommand { name: payload.name })
        .await?;
    Ok(Json(OperationResponse::ok()))
}

pub async fn update_tag(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    state
        .tags
        .update(id, UpdateTagCommand { name: payload.name })
        .await?;
    Ok(Json(OperationResponse::ok()))
}

pub async fn delete_tag(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = id?;
    state.tags.delete(id).await?;
    Ok(Json(OperationResponse::ok()))
}
