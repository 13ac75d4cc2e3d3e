//! `/api/project-members` handlers.

use super::{
    AppState,
    auth::CurrentUser,
    error::{ApiJson, ApiQuery},
};
use crate::{
    core::member::{self, MemberAddition, MemberRoleUpdate, NewMember},
    entities::project_member,
    errors::Result,
};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub project_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveQuery {
    pub project_id: i64,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub removed: bool,
}

async fn list_members(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> Result<ApiJson<Vec<project_member::Model>>> {
    let members = member::list_members(&state.db, &actor, query.project_id).await?;
    Ok(ApiJson(members))
}

/// 201 when the member is new, 200 when they were already on the project.
async fn add_member(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(request): ApiJson<NewMember>,
) -> Result<(StatusCode, ApiJson<MemberAddition>)> {
    let addition = member::add_member(
        &state.db,
        state.mailer.as_ref(),
        &state.app_base_url,
        &actor,
        request,
    )
    .await?;
    let status = if addition.added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, ApiJson(addition)))
}

async fn update_member(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(request): ApiJson<MemberRoleUpdate>,
) -> Result<ApiJson<project_member::Model>> {
    let updated = member::update_member_role(&state.db, &actor, request).await?;
    Ok(ApiJson(updated))
}

async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(query): ApiQuery<RemoveQuery>,
) -> Result<ApiJson<Removed>> {
    member::remove_member(
        &state.db,
        state.mailer.as_ref(),
        &actor,
        query.project_id,
        &query.email,
    )
    .await?;
    Ok(ApiJson(Removed { removed: true }))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/project-members",
        get(list_members)
            .post(add_member)
            .patch(update_member)
            .delete(remove_member),
    )
}
