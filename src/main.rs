use std::{process, sync::Arc};

use axum::{ServiceExt, extract::Request};
use newsroom::{
    application::{
        error::AppError,
        news::NewsService,
        repos::{HealthRepo, NewsRepo, NewsWriteRepo, TagsRepo, TagsWriteRepo},
        tags::TagService,
    },
    cache::{CacheConfig, CacheCoordinator, CacheStore, CacheTrigger, MemoryStore, RedisStore},
    config,
    infra::{
        db::{PostgresRepositories, SeedPlan},
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
        config::Command::Seed(args) => run_seed(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = build_cache(&settings).await;

    let news_reader: Arc<dyn NewsRepo> = repositories.clone();
    let news_writer: Arc<dyn NewsWriteRepo> = repositories.clone();
    let tags_reader: Arc<dyn TagsRepo> = repositories.clone();
    let tags_writer: Arc<dyn TagsWriteRepo> = repositories.clone();
    let health: Arc<dyn HealthRepo> = repositories;

    let state = ApiState {
        news: Arc::new(NewsService::new(news_reader, news_writer, cache.clone())),
        tags: Arc::new(TagService::new(tags_reader, tags_writer, cache)),
        health,
    };

    serve_http(&settings, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    drop(repositories);
    info!(target = "newsroom::migrate", "Migrations applied");
    Ok(())
}

async fn run_seed(settings: config::Settings, args: config::SeedArgs) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let plan = SeedPlan {
        tags: args.tags,
        articles: args.articles,
        links: args.links,
    };

    info!(
        target = "newsroom::seed",
        tags = plan.tags,
        articles = plan.articles,
        links = plan.links,
        "Seeding demo data"
    );
    let summary = repositories.seed(plan).await?;
    info!(
        target = "newsroom::seed",
        tags = summary.tags,
        articles = summary.articles,
        links = summary.links,
        "Seed completed"
    );
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

/// Picks the cache backend. An unreachable Redis does not fail startup; the
/// store keeps retrying its connection and reads miss until it succeeds.
async fn build_cache(settings: &config::Settings) -> CacheTrigger {
    let cache_config = CacheConfig::from(&settings.cache);
    if !cache_config.is_enabled() {
        info!(target = "newsroom::cache", "Cache disabled");
        return CacheTrigger::new(Arc::new(CacheCoordinator::disabled()));
    }

    let store: Arc<dyn CacheStore> = match cache_config.redis_url.as_deref() {
        Some(url) => match RedisStore::new(url, &cache_config) {
            Ok(store) => {
                if let Err(err) = store.connect_now().await {
                    warn!(
                        target = "newsroom::cache",
                        error = %err,
                        "Redis unavailable at startup, reads miss until it is reachable"
                    );
                }
                Arc::new(store)
            }
            Err(err) => {
                warn!(
                    target = "newsroom::cache",
                    error = %err,
                    "Redis URL rejected, running without cache"
                );
                return CacheTrigger::new(Arc::new(CacheCoordinator::disabled()));
            }
        },
        None => Arc::new(MemoryStore::new(&cache_config)),
    };

    info!(
        target = "newsroom::cache",
        backend = store.backend(),
        timeout_ms = cache_config.operation_timeout_ms,
        ttl_seconds = cache_config.ttl_seconds.unwrap_or(0),
        "Cache ready"
    );
    CacheTrigger::new(Arc::new(CacheCoordinator::new(cache_config, store)))
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let app = NormalizePathLayer::trim_trailing_slash().layer(router);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "newsroom::http", addr = %settings.server.addr, "Listening");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "newsroom::http", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
