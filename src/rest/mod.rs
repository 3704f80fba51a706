// rest/mod.rs — HTTP API server for the task board.
//
// Axum server bound to {bind_address}:{port} (local only by default).
// JSON endpoints feed programmatic clients; the fragment endpoints return
// rendered HTML for the HTMX/SortableJS front end.

pub mod fragments;
pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, patch},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("task board API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(routes::health::health))
        // Tasks (JSON)
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::replace_task)
                .patch(routes::tasks::patch_task)
                .delete(routes::tasks::delete_task),
        )
        // Tasks (HTML fragments for the board UI)
        .route("/api/tasks/{id}/detail", get(routes::tasks::task_detail))
        .route(
            "/api/tasks/quadrant/{quadrant}",
            get(routes::tasks::quadrant_tasks),
        )
        .route(
            "/api/tasks/{id}/quadrant",
            patch(routes::tasks::move_task),
        )
        .route(
            "/api/tasks/quadrant/{quadrant}/reorder",
            patch(routes::tasks::reorder_quadrant),
        )
        // Export
        .route("/api/export", get(routes::tasks::export))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
