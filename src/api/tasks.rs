//! Admin task board handlers. Every route requires an admin.

use super::{
    AppState,
    auth::AdminUser,
    error::{ApiJson, ApiQuery},
};
use crate::{
    core::task::{self, NewTask, TaskUpdate},
    entities::{admin_task, admin_task_event},
    errors::Result,
};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TaskIdQuery {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

async fn list_tasks(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<ApiJson<Vec<admin_task::Model>>> {
    Ok(ApiJson(task::list_tasks(&state.db).await?))
}

async fn create_task(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(request): ApiJson<NewTask>,
) -> Result<(StatusCode, ApiJson<admin_task::Model>)> {
    let created = task::create_task(&state.db, &admin, request).await?;
    Ok((StatusCode::CREATED, ApiJson(created)))
}

async fn update_task(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(update): ApiJson<TaskUpdate>,
) -> Result<ApiJson<admin_task::Model>> {
    Ok(ApiJson(task::update_task(&state.db, &admin, update).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiQuery(query): ApiQuery<TaskIdQuery>,
) -> Result<ApiJson<Deleted>> {
    task::delete_task(&state.db, &admin, query.id).await?;
    Ok(ApiJson(Deleted { deleted: true }))
}

async fn reorder_tasks(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> Result<ApiJson<Vec<admin_task::Model>>> {
    Ok(ApiJson(
        task::reorder_tasks(&state.db, &admin, &request.ids).await?,
    ))
}

/// Event history for one task, oldest first. Deleted tasks keep their history.
async fn list_task_events(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<ApiJson<Vec<admin_task_event::Model>>> {
    Ok(ApiJson(task::get_task_events(&state.db, id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/tasks/tasks",
            get(list_tasks)
                .post(create_task)
                .patch(update_task)
                .delete(delete_task),
        )
        .route("/api/admin/tasks/reorder", post(reorder_tasks))
        .route("/api/admin/tasks/{id}/events", get(list_task_events))
}
