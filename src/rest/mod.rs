// rest/mod.rs — Task REST API server.
//
// Axum HTTP server exposing the task endpoints plus the static frontend.
//
// Endpoints:
//   GET    /api/tasks
//   POST   /api/tasks
//   GET    /api/tasks/{id}
//   PUT    /api/tasks/{id}
//   PATCH  /api/tasks/{id}/status
//   DELETE /api/tasks/{id}
//   GET    /api/health
//   GET    /            (static frontend from the configured public dir)

pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, patch},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("task API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    // Frontend assets, index.html at `/` — everything not under /api.
    let static_files = ServeDir::new(&ctx.config.public_dir);

    Router::new()
        .route("/api/health", get(routes::health::health))
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/api/tasks/{id}/status",
            patch(routes::tasks::update_task_status),
        )
        .fallback_service(static_files)
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(err = %e, "could not listen for shutdown signal");
        return;
    }
    info!("interrupt received — shutting down");
}
