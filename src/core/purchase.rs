//! Package purchase: turns an active package into a proposed sprint for the buyer.

use crate::{
    core::{
        package::{self, PackageDetail},
        pricing::PricingPolicy,
        project,
        sprint::{self, CreatedSprint, PURCHASED_STATUS, SprintDraftPlan, SprintLine},
    },
    entities::{sprint_package, user},
    errors::{Error, Result},
    services::mailer::{self, Mailer},
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use tracing::{info, instrument, warn};

/// Optional buyer input for a purchase.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Existing project to attach the sprint to; a new one is created otherwise
    pub project_id: Option<i64>,
    /// Sprint title; defaults to the package name
    pub title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

/// Result of a successful purchase.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub package: sprint_package::Model,
    pub sprint: CreatedSprint,
}

/// Purchases a package for `buyer`.
///
/// The project, document, draft and snapshot rows are written in one transaction.
/// The confirmation email is sent after commit; a delivery failure is logged and
/// does not fail the purchase.
///
/// # Errors
/// - `Error::PackageNotFound` if the package is unknown or inactive
/// - `Error::Validation` for a due date before the start date
/// - `Error::ProjectNotFound` / `Error::Forbidden` for a `project_id` the buyer does not own
#[instrument(skip(db, policy, mailer, app_base_url, buyer, request), fields(buyer = buyer.id))]
pub async fn purchase_package(
    db: &DatabaseConnection,
    policy: &PricingPolicy,
    mailer: &dyn Mailer,
    app_base_url: &str,
    buyer: &user::Model,
    key: &str,
    request: PurchaseRequest,
) -> Result<PurchaseReceipt> {
    if let (Some(start), Some(due)) = (request.start_date, request.due_date) {
        if due < start {
            return Err(Error::validation("Due date cannot be before start date"));
        }
    }

    let txn = db.begin().await?;

    let PackageDetail {
        package: pkg,
        lines,
        ..
    } = package::get_package_detail(&txn, policy, key).await?;

    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(&pkg.name)
        .to_string();
    let project = project::resolve_or_create_project(&txn, buyer, request.project_id, &title).await?;

    let created = sprint::insert_sprint_draft(
        &txn,
        policy,
        buyer.id,
        SprintDraftPlan {
            title,
            status: PURCHASED_STATUS.to_string(),
            project,
            sprint_package_id: Some(pkg.id),
            terms: package::package_terms(&pkg),
            start_date: request.start_date,
            due_date: request.due_date,
            lines: lines.iter().map(SprintLine::from).collect(),
        },
    )
    .await?;

    txn.commit().await?;
    info!(
        package = %pkg.slug,
        sprint_draft_id = created.draft.id,
        price = created.draft.total_fixed_price,
        "Package purchased"
    );

    let email = mailer::purchase_confirmation(
        &buyer.email,
        &pkg.name,
        &created.draft.title,
        created.draft.id,
        created.draft.total_fixed_price,
        app_base_url,
    );
    if let Err(e) = mailer.send(&email).await {
        warn!(error = %e, sprint_draft_id = created.draft.id, "Failed to send purchase confirmation");
    }

    Ok(PurchaseReceipt {
        package: pkg,
        sprint: created,
    })
}
