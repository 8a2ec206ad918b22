pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{get, put},
};

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/news",
            get(handlers::list_news).post(handlers::create_news),
        )
        .route(
            "/news/{id}",
            get(handlers::get_news)
                .put(handlers::update_news)
                .delete(handlers::delete_news),
        )
        .route("/news/{id}/publish", put(handlers::publish_news))
        .route("/news/{id}/draft", put(handlers::draft_news))
        .route("/news/{id}/deleted", put(handlers::mark_news_deleted))
        .route("/tags", get(handlers::list_tags).post(handlers::create_tag))
        .route(
            "/tags/{id}",
            put(handlers::update_tag).delete(handlers::delete_tag),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
}
