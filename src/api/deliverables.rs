//! Catalog handlers. Listing is public; edits are admin only.

use super::{AppState, auth::AdminUser, error::ApiJson};
use crate::{
    core::catalog::{self, DeliverableUpdate, NewDeliverable},
    entities::deliverable,
    errors::Result,
};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};

async fn list_deliverables(
    State(state): State<AppState>,
) -> Result<ApiJson<Vec<deliverable::Model>>> {
    Ok(ApiJson(catalog::get_active_deliverables(&state.db).await?))
}

async fn create_deliverable(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiJson(input): ApiJson<NewDeliverable>,
) -> Result<(StatusCode, ApiJson<deliverable::Model>)> {
    let created = catalog::create_deliverable(&state.db, input).await?;
    Ok((StatusCode::CREATED, ApiJson(created)))
}

async fn update_deliverable(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    ApiJson(update): ApiJson<DeliverableUpdate>,
) -> Result<ApiJson<deliverable::Model>> {
    Ok(ApiJson(
        catalog::update_deliverable(&state.db, id, update).await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/deliverables",
            get(list_deliverables).post(create_deliverable),
        )
        .route("/api/deliverables/{id}", patch(update_deliverable))
}
