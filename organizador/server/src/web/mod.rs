use axum::Router;
use axum::http::header;
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::Database;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::task::{SeaOrmTaskStore, TaskState, create_task_router};

pub mod api;

/// Assembles the full application: task routes, API docs and the health check.
pub fn create_app(task_state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .merge(create_task_router(task_state))
        .merge(api::create_docs_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().expose_headers([header::LOCATION])),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let task_state = Arc::new(TaskState {
        store: Arc::new(SeaOrmTaskStore::new(db)),
    });
    let app = create_app(task_state);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
