//! Package listing, detail and purchase handlers.

use super::{AppState, auth::CurrentUser, error::ApiJson};
use crate::{
    core::{
        package::{self, PackageDetail, PackageLine},
        pricing::Quote,
        purchase::{self, PurchaseRequest},
    },
    errors::{Error, Result},
};
use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub deliverable_count: usize,
    pub quote: Quote,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageLineView {
    pub deliverable_id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub scope: String,
    pub quantity: i32,
    pub base_points: f64,
    pub complexity_score: f64,
    pub complexity_multiplier: f64,
    pub points: f64,
    pub weighted_points: f64,
    pub hours: f64,
}

impl From<&PackageLine> for PackageLineView {
    fn from(line: &PackageLine) -> Self {
        Self {
            deliverable_id: line.deliverable.id,
            name: line.deliverable.name.clone(),
            description: line.deliverable.description.clone(),
            category: line.deliverable.category.clone(),
            scope: line.deliverable.scope.clone(),
            quantity: line.selection.quantity,
            base_points: line.selection.base_points,
            complexity_score: line.complexity_score(),
            complexity_multiplier: line.selection.complexity_multiplier,
            points: line.totals.points,
            weighted_points: line.totals.weighted_points,
            hours: line.totals.hours,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetailView {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub flat_fee: Option<f64>,
    pub flat_hours: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub deliverables: Vec<PackageLineView>,
    pub quote: Quote,
}

impl From<PackageDetail> for PackageDetailView {
    fn from(detail: PackageDetail) -> Self {
        let pkg = detail.package;
        Self {
            id: pkg.id,
            slug: pkg.slug,
            name: pkg.name,
            description: pkg.description,
            flat_fee: pkg.flat_fee,
            flat_hours: pkg.flat_hours,
            discount_percentage: pkg.discount_percentage,
            deliverables: detail.lines.iter().map(PackageLineView::from).collect(),
            quote: detail.quote,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub sprint_draft_id: i64,
    pub document_id: i64,
    pub project_id: i64,
    pub total_price: f64,
    pub subtotal: f64,
    pub savings: f64,
    pub total_hours: f64,
}

async fn list_packages(State(state): State<AppState>) -> Result<ApiJson<Vec<PackageSummary>>> {
    let details = package::list_active_packages(&state.db, &state.policy).await?;
    let summaries = details
        .into_iter()
        .map(|d| PackageSummary {
            id: d.package.id,
            slug: d.package.slug,
            name: d.package.name,
            description: d.package.description,
            deliverable_count: d.lines.len(),
            quote: d.quote,
        })
        .collect();
    Ok(ApiJson(summaries))
}

async fn get_package(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<ApiJson<PackageDetailView>> {
    let detail = package::get_package_detail(&state.db, &state.policy, &slug).await?;
    Ok(ApiJson(detail.into()))
}

/// The body is optional; an empty body purchases with defaults.
async fn purchase_package(
    State(state): State<AppState>,
    CurrentUser(buyer): CurrentUser,
    Path(id_or_slug): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, ApiJson<PurchaseResponse>)> {
    let request: PurchaseRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PurchaseRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| Error::validation(format!("Invalid purchase request: {e}")))?
    };

    let receipt = purchase::purchase_package(
        &state.db,
        &state.policy,
        state.mailer.as_ref(),
        &state.app_base_url,
        &buyer,
        &id_or_slug,
        request,
    )
    .await?;

    let draft = &receipt.sprint.draft;
    Ok((
        StatusCode::CREATED,
        ApiJson(PurchaseResponse {
            sprint_draft_id: draft.id,
            document_id: draft.document_id,
            project_id: draft.project_id,
            total_price: draft.total_fixed_price,
            subtotal: receipt.sprint.quote.subtotal,
            savings: receipt.sprint.quote.savings,
            total_hours: draft.total_fixed_hours,
        }),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sprint-packages", get(list_packages))
        .route(
            "/api/sprint-packages/{id_or_slug}/purchase",
            post(purchase_package),
        )
        .route("/api/packages/{slug}", get(get_package))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::super::test_support::{send, test_state};
    use crate::core::pricing::PricingPolicy;
    use crate::test_utils::*;
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_package_detail_and_list() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        setup_package(&db, "launch", &[(3.0, 1, None), (5.0, 1, Some(5.0))]).await?;
        let state = test_state(
            &db,
            Arc::new(RecordingMailer::default()),
            Arc::new(StubComposer::replying("s", "b")),
        );
        let policy = PricingPolicy::default();

        let (status, detail) = send(&state, Method::GET, "/api/packages/launch", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let lines = detail["deliverables"].as_array().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["complexityMultiplier"], 2.0);
        assert_eq!(lines[1]["weightedPoints"], 10.0);
        assert_eq!(detail["quote"]["totals"]["weightedPoints"], 13.0);
        assert_eq!(detail["quote"]["price"], policy.price_from_points(13.0));

        let (status, list) = send(&state, Method::GET, "/api/sprint-packages", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list[0]["slug"], "launch");
        assert_eq!(list[0]["deliverableCount"], 2);

        let (status, _) = send(&state, Method::GET, "/api/packages/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_purchase_endpoint() -> crate::errors::Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "buyer@example.com", "client").await?;
        let (package, _) = setup_package(&db, "kickoff", &[(3.0, 1, None), (5.0, 1, None)]).await?;
        set_package_terms(&db, package.id, Some(4500.0), None, None).await?;
        let mailer = Arc::new(RecordingMailer::default());
        let state = test_state(&db, Arc::clone(&mailer), Arc::new(StubComposer::replying("s", "b")));
        let token = session_token("buyer@example.com");

        let uri = format!("/api/sprint-packages/{}/purchase", package.id);
        let (status, _) = send(&state, Method::POST, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, receipt) = send(&state, Method::POST, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(receipt["totalPrice"], 4500.0);
        let subtotal = PricingPolicy::default().price_from_points(8.0);
        assert_eq!(receipt["subtotal"], subtotal);
        assert_eq!(receipt["savings"], (subtotal - 4500.0).max(0.0));
        assert_eq!(mailer.sent().len(), 1);

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/sprint-packages/kickoff/purchase",
            Some(&token),
            Some(json!({ "title": "Acme kickoff" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &state,
            Method::POST,
            "/api/sprint-packages/unknown/purchase",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }
}
