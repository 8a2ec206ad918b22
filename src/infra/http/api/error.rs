use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::error::ErrorReport;
use crate::application::news::NewsError;
use crate::application::repos::RepoError;
use crate::application::tags::TagError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub code: u16,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    source: &'static str,
    hint: Option<String>,
    detail: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, source: &'static str, hint: Option<String>) -> Self {
        Self {
            status,
            source,
            hint,
            detail: Vec::new(),
        }
    }

    pub fn bad_request(hint: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "infra::http::api", Some(hint.into()))
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "infra::http::api", None)
    }

    pub fn internal(source: &'static str, error: &dyn std::error::Error) -> Self {
        let report = ErrorReport::from_error(source, StatusCode::INTERNAL_SERVER_ERROR, error);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            source,
            hint: None,
            detail: report.messages,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Reason phrase used as the envelope `message`.
    fn message(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown Error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.message();
        let body = ApiErrorBody {
            code: self.status.as_u16(),
            message,
            hint: self.hint.clone(),
        };
        let mut response = (self.status, Json(body)).into_response();

        let report = if self.detail.is_empty() {
            ErrorReport::from_message(
                self.source,
                self.status,
                self.hint.unwrap_or_else(|| message.to_string()),
            )
        } else {
            ErrorReport {
                source: self.source,
                status: self.status,
                messages: self.detail,
            }
        };
        report.attach(&mut response);
        response
    }
}

pub fn repo_to_api(source: &'static str, err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::new(StatusCode::NOT_FOUND, source, None),
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::BAD_REQUEST,
            source,
            Some(format!("duplicate value violates {constraint}")),
        ),
        RepoError::InvalidInput { message } => {
            ApiError::new(StatusCode::BAD_REQUEST, source, Some(message))
        }
        other => ApiError::internal(source, &other),
    }
}

impl From<NewsError> for ApiError {
    fn from(err: NewsError) -> Self {
        const SOURCE: &str = "infra::http::api::news";
        match err {
            NewsError::ConstraintViolation(field) => ApiError::new(
                StatusCode::BAD_REQUEST,
                SOURCE,
                Some(format!("{field} is required")),
            ),
            NewsError::NotFound => ApiError::new(StatusCode::NOT_FOUND, SOURCE, None),
            NewsError::Repo(err) => repo_to_api(SOURCE, err),
            other @ NewsError::Encode(_) => ApiError::internal(SOURCE, &other),
        }
    }
}

impl From<TagError> for ApiError {
    fn from(err: TagError) -> Self {
        const SOURCE: &str = "infra::http::api::tags";
        match err {
            TagError::ConstraintViolation(field) => ApiError::new(
                StatusCode::BAD_REQUEST,
                SOURCE,
                Some(format!("{field} is required")),
            ),
            TagError::NotFound => ApiError::new(StatusCode::NOT_FOUND, SOURCE, None),
            TagError::Repo(err) => repo_to_api(SOURCE, err),
            other @ TagError::Encode(_) => ApiError::internal(SOURCE, &other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}
