//! `/api/sprint-drafts` handlers.

use super::{
    AppState,
    auth::{AdminUser, CurrentUser},
    error::{ApiJson, ApiQuery},
};
use crate::{
    core::{
        sprint::{self, CreatedSprint, NewSprintDraft},
        summary::{self, SummaryMode, SummaryRequest},
    },
    entities::{sprint_daily_update, sprint_deliverable, sprint_draft},
    errors::{Error, Result},
};
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintDraftCreated {
    pub sprint_draft_id: i64,
    pub document_id: i64,
    pub project_id: i64,
    /// Weighted points; the draft row stores the unweighted sum
    pub total_complexity: f64,
    pub total_hours: f64,
    pub total_price: f64,
    pub deliverable_count: i32,
}

impl From<&CreatedSprint> for SprintDraftCreated {
    fn from(created: &CreatedSprint) -> Self {
        let draft = &created.draft;
        Self {
            sprint_draft_id: draft.id,
            document_id: draft.document_id,
            project_id: draft.project_id,
            total_complexity: created.quote.totals.weighted_points,
            total_hours: draft.total_fixed_hours,
            total_price: draft.total_fixed_price,
            deliverable_count: draft.deliverable_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintDraftView {
    #[serde(flatten)]
    pub draft: sprint_draft::Model,
    pub deliverables: Vec<sprint_deliverable::Model>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintDraftQuery {
    pub id: Option<i64>,
    pub project_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub mode: SummaryMode,
    pub subject: String,
    pub body: String,
    pub update_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sent_to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_recipients: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewDailyUpdate {
    pub body: String,
}

async fn create_sprint_draft(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(request): ApiJson<NewSprintDraft>,
) -> Result<(StatusCode, ApiJson<SprintDraftCreated>)> {
    let created = sprint::create_sprint_draft(&state.db, &state.policy, &actor, request).await?;
    Ok((
        StatusCode::CREATED,
        ApiJson(SprintDraftCreated::from(&created)),
    ))
}

/// `?id=` returns one draft with its deliverables; `?projectId=` lists a project's drafts.
async fn get_sprint_drafts(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(query): ApiQuery<SprintDraftQuery>,
) -> Result<ApiJson<serde_json::Value>> {
    let value = match (query.id, query.project_id) {
        (Some(id), _) => {
            let detail = sprint::get_sprint_draft(&state.db, &actor, id).await?;
            serde_json::to_value(SprintDraftView {
                draft: detail.draft,
                deliverables: detail.deliverables,
            })
        }
        (None, Some(project_id)) => {
            let drafts =
                sprint::list_sprint_drafts_for_project(&state.db, &actor, project_id).await?;
            serde_json::to_value(drafts)
        }
        (None, None) => return Err(Error::validation("id or projectId is required")),
    };
    Ok(ApiJson(value?))
}

async fn delete_sprint_draft(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiQuery(query): ApiQuery<IdQuery>,
) -> Result<ApiJson<Deleted>> {
    sprint::delete_sprint_draft(&state.db, &actor, query.id).await?;
    Ok(ApiJson(Deleted { deleted: true }))
}

async fn daily_summary(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<SummaryRequest>,
) -> Result<ApiJson<SummaryResponse>> {
    let outcome = summary::daily_summary(
        &state.db,
        state.composer.as_ref(),
        &state.links,
        state.mailer.as_ref(),
        id,
        request,
    )
    .await?;
    Ok(ApiJson(SummaryResponse {
        mode: outcome.mode,
        subject: outcome.subject,
        body: outcome.body,
        update_count: outcome.update_count,
        sent_to: outcome.recipients,
        failed_recipients: outcome.failed,
    }))
}

async fn add_daily_update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<NewDailyUpdate>,
) -> Result<(StatusCode, ApiJson<sprint_daily_update::Model>)> {
    let update = sprint::add_daily_update(&state.db, &admin, id, &request.body).await?;
    Ok((StatusCode::CREATED, ApiJson(update)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/sprint-drafts",
            post(create_sprint_draft)
                .get(get_sprint_drafts)
                .delete(delete_sprint_draft),
        )
        .route("/api/sprint-drafts/{id}/daily-summary", post(daily_summary))
        .route("/api/sprint-drafts/{id}/updates", post(add_daily_update))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::super::test_support::{send, test_state};
    use crate::test_utils::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_get_delete_sprint_draft() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "client@example.com", "client").await?;
        let landing = create_test_deliverable(&db, "Landing", 3.0).await?;
        let auth = create_test_deliverable(&db, "Auth", 5.0).await?;
        let state = test_state(
            &db,
            Arc::new(RecordingMailer::default()),
            Arc::new(StubComposer::replying("s", "b")),
        );
        let token = session_token("client@example.com");

        let (status, created) = send(
            &state,
            Method::POST,
            "/api/sprint-drafts",
            Some(&token),
            Some(json!({
                "title": "Acme launch",
                "deliverables": [
                    { "deliverableId": landing.id },
                    { "deliverableId": auth.id, "quantity": 1, "complexityScore": 5.0 }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["totalComplexity"], 13.0);
        assert_eq!(created["deliverableCount"], 2);
        let id = created["sprintDraftId"].as_i64().unwrap();

        let (status, detail) = send(
            &state,
            Method::GET,
            &format!("/api/sprint-drafts?id={id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["title"], "Acme launch");
        assert_eq!(detail["deliverables"].as_array().unwrap().len(), 2);
        assert_eq!(detail["totalEstimatePoints"], 8.0);

        let uri = format!("/api/sprint-drafts?id={id}");
        let (status, _) = send(&state, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&state, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_sprint_draft_errors() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "client@example.com", "client").await?;
        let state = test_state(
            &db,
            Arc::new(RecordingMailer::default()),
            Arc::new(StubComposer::replying("s", "b")),
        );
        let token = session_token("client@example.com");

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/sprint-drafts",
            None,
            Some(json!({ "title": "x", "sprintPackageId": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/sprint-drafts",
            Some(&token),
            Some(json!({ "title": "x", "deliverables": [{ "deliverableId": 31337 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("31337"));

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/sprint-drafts",
            Some(&token),
            Some(json!({ "title": "x", "sprintPackageId": 99 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/sprint-drafts",
            Some(&token),
            Some(json!({ "deliverables": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_daily_summary_is_admin_only() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "client@example.com", "client").await?;
        create_test_user(&db, "admin@example.com", "admin").await?;
        let landing = create_test_deliverable(&db, "Landing", 3.0).await?;
        let composer = Arc::new(StubComposer::replying("Day 1", "All good."));
        let state = test_state(&db, Arc::new(RecordingMailer::default()), composer);
        let client = session_token("client@example.com");
        let admin = session_token("admin@example.com");

        let (_, created) = send(
            &state,
            Method::POST,
            "/api/sprint-drafts",
            Some(&client),
            Some(json!({ "title": "Acme", "deliverables": [{ "deliverableId": landing.id }] })),
        )
        .await;
        let id = created["sprintDraftId"].as_i64().unwrap();
        let summary_uri = format!("/api/sprint-drafts/{id}/daily-summary");

        let (status, _) = send(
            &state,
            Method::POST,
            &summary_uri,
            Some(&client),
            Some(json!({ "mode": "preview" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &state,
            Method::POST,
            &format!("/api/sprint-drafts/{id}/updates"),
            Some(&admin),
            Some(json!({ "body": "Wireframes signed off" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, preview) = send(
            &state,
            Method::POST,
            &summary_uri,
            Some(&admin),
            Some(json!({ "mode": "preview" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(preview["mode"], "preview");
        assert_eq!(preview["subject"], "Day 1");
        assert_eq!(preview["updateCount"], 1);
        assert!(preview.get("sentTo").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_daily_summary_upstream_statuses() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "admin@example.com", "admin").await?;
        let landing = create_test_deliverable(&db, "Landing", 3.0).await?;
        let admin = session_token("admin@example.com");
        let setup = test_state(
            &db,
            Arc::new(RecordingMailer::default()),
            Arc::new(StubComposer::replying("s", "b")),
        );
        let (_, created) = send(
            &setup,
            Method::POST,
            "/api/sprint-drafts",
            Some(&admin),
            Some(json!({ "title": "Acme", "deliverables": [{ "deliverableId": landing.id }] })),
        )
        .await;
        let uri = format!(
            "/api/sprint-drafts/{}/daily-summary",
            created["sprintDraftId"].as_i64().unwrap()
        );

        let cases = [
            (crate::errors::Error::UpstreamTimeout, StatusCode::GATEWAY_TIMEOUT),
            (
                crate::errors::Error::Upstream {
                    message: "500 from provider".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                crate::errors::Error::Config {
                    message: "OPENAI_API_KEY is not set".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            let state = test_state(
                &db,
                Arc::new(RecordingMailer::default()),
                Arc::new(StubComposer::failing(error)),
            );
            let (status, _) = send(
                &state,
                Method::POST,
                &uri,
                Some(&admin),
                Some(json!({ "mode": "preview" })),
            )
            .await;
            assert_eq!(status, expected);
        }
        Ok(())
    }
}
