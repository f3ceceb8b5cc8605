// rest/routes/tasks.rs — Task CRUD + status transition routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::storage::{TaskChanges, TaskStatus};
use crate::AppContext;

type ApiError = (StatusCode, Json<Value>);

fn store_failure(what: &str, err: anyhow::Error) -> ApiError {
    error!(err = %err, "{what}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": what })),
    )
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Task not found" })),
    )
}

pub async fn list_tasks(State(ctx): State<Arc<AppContext>>) -> Result<Json<Value>, ApiError> {
    match ctx.storage.list_tasks().await {
        Ok(tasks) => Ok(Json(json!({ "tasks": tasks }))),
        Err(e) => Err(store_failure("Failed to fetch tasks", e)),
    }
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    match ctx.storage.get_task(id).await {
        Ok(Some(task)) => Ok(Json(json!({ "task": task }))),
        Ok(None) => Err(not_found()),
        Err(e) => Err(store_failure("Failed to fetch task", e)),
    }
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "Normal".to_string()
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let title = match &body.title {
        Some(t) if !t.trim().is_empty() => t.clone(),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Title is required" })),
            ))
        }
    };

    match ctx
        .storage
        .create_task(&title, &body.description, &body.priority)
        .await
    {
        // The response echoes caller input plus the generated id — the
        // inserted row is not read back.
        Ok(id) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "task": {
                    "id": id,
                    "title": title,
                    "description": body.description,
                    "status": TaskStatus::Todo.as_str(),
                    "priority": body.priority,
                }
            })),
        )),
        Err(e) => Err(store_failure("Failed to create task", e)),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

/// Partial update: only the supplied fields are written, in fixed column
/// order. Values are not validated here — `status` in particular is only
/// checked by the dedicated `/status` route.
pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<Value>, ApiError> {
    let changes = TaskChanges {
        title: body.title,
        description: body.description,
        status: body.status,
        priority: body.priority,
    };

    if changes.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No fields to update" })),
        ));
    }

    match ctx.storage.update_task(id, &changes).await {
        Ok(0) => Err(not_found()),
        Ok(_) => Ok(Json(json!({ "message": "Task updated successfully" }))),
        Err(e) => Err(store_failure("Failed to update task", e)),
    }
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    match ctx.storage.delete_task(id).await {
        Ok(0) => Err(not_found()),
        Ok(_) => Ok(Json(json!({ "message": "Task deleted successfully" }))),
        Err(e) => Err(store_failure("Failed to delete task", e)),
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

pub async fn update_task_status(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, ApiError> {
    let status = match body.status.as_deref().and_then(TaskStatus::parse) {
        Some(s) => s,
        None => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Invalid status. Must be TODO, IN_PROGRESS, or DONE"
                })),
            ))
        }
    };

    match ctx.storage.set_task_status(id, status).await {
        Ok(0) => Err(not_found()),
        Ok(_) => Ok(Json(json!({
            "message": "Task status updated successfully",
            "status": status.as_str(),
        }))),
        Err(e) => Err(store_failure("Failed to update task status", e)),
    }
}
