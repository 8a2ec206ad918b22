pub mod api;
mod middleware;

pub use api::{ApiState, build_api_router};
pub use middleware::REQUEST_ID_HEADER;

use axum::{Router, middleware as axum_middleware};

/// Full HTTP surface with request ids and response logging.
pub fn build_router(state: ApiState) -> Router {
    build_api_router(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
