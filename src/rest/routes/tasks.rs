// rest/routes/tasks.rs — Task CRUD, quadrant moves, reorder, export.

use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::rest::fragments;
use crate::storage::TaskRow;
use crate::tasks::export::{export_filename, render_markdown};
use crate::tasks::{MoveRequest, ReorderRequest, TaskInput, TaskPatch};
use crate::AppContext;

// ─── JSON endpoints ──────────────────────────────────────────────────────────

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<Vec<TaskRow>>, ApiError> {
    Ok(Json(ctx.tasks.list().await?))
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<TaskInput>,
) -> Result<Json<TaskRow>, ApiError> {
    let task = ctx.tasks.create(body).await?;
    Ok(Json(task))
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<TaskRow>, ApiError> {
    Ok(Json(ctx.tasks.get(id).await?))
}

pub async fn replace_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<TaskInput>,
) -> Result<Json<TaskRow>, ApiError> {
    Ok(Json(ctx.tasks.replace(id, body).await?))
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    ctx.tasks.delete(id).await?;
    Ok(Json(json!({ "message": "task deleted" })))
}

// ─── Fragment endpoints (HTMX) ───────────────────────────────────────────────

pub async fn task_detail(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Html<String>, ApiError> {
    let task = ctx.tasks.get(id).await?;
    Ok(Html(fragments::task_detail(&task)))
}

pub async fn quadrant_tasks(
    State(ctx): State<Arc<AppContext>>,
    Path(quadrant): Path<i64>,
) -> Result<Html<String>, ApiError> {
    let tasks = ctx.tasks.list_quadrant(quadrant).await?;
    Ok(Html(fragments::task_list(quadrant, &tasks)))
}

/// Partial update — completion toggles and inline edits from the board.
/// Returns the re-rendered card so HTMX can swap it in place.
pub async fn patch_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<TaskPatch>,
) -> Result<Html<String>, ApiError> {
    let task = ctx.tasks.patch(id, body).await?;
    Ok(Html(fragments::task_card(&task)))
}

/// Drag-and-drop between quadrants.
pub async fn move_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<MoveRequest>,
) -> Result<Html<String>, ApiError> {
    let task = ctx.tasks.move_to_quadrant(id, body.quadrant).await?;
    Ok(Html(fragments::task_card(&task)))
}

/// Drag-and-drop reordering within one quadrant. The body carries the full
/// intended order; the response re-renders the whole list.
pub async fn reorder_quadrant(
    State(ctx): State<Arc<AppContext>>,
    Path(quadrant): Path<i64>,
    Json(body): Json<ReorderRequest>,
) -> Result<Html<String>, ApiError> {
    let tasks = ctx.tasks.reorder(quadrant, &body.task_ids).await?;
    Ok(Html(fragments::task_list(quadrant, &tasks)))
}

// ─── Export ──────────────────────────────────────────────────────────────────

pub async fn export(State(ctx): State<Arc<AppContext>>) -> Result<Response, ApiError> {
    let tasks = ctx.tasks.list().await?;
    let now = Utc::now();
    let body = render_markdown(&tasks, now);
    let headers = [
        (
            header::CONTENT_TYPE,
            "text/markdown; charset=utf-8".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export_filename(now)),
        ),
    ];
    Ok((headers, body).into_response())
}
