//! Sprint draft business logic.
//!
//! A sprint draft is created from either a package or an ad hoc list of catalog
//! deliverables. Creation runs in one database transaction: project (if needed),
//! backing document, draft row, one snapshot row per deliverable, then the derived
//! totals. The totals are computed from the snapshot rows that were just written,
//! never taken from the caller.

use crate::{
    core::{
        catalog,
        package::{self, PackageDetail},
        pricing::{
            PackageTerms, PricingPolicy, Quote, STANDARD_COMPLEXITY, Selection,
            complexity_multiplier, normalize_quantity, round_cents,
        },
        project,
    },
    entities::{
        Document, SprintDailyUpdate, SprintDeliverable, SprintDraft, deliverable, document,
        project as project_entity, sprint_daily_update, sprint_deliverable, sprint_draft, user,
    },
    errors::{Error, Result},
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use tracing::{info, instrument};

/// Statuses a sprint draft may carry.
pub const SPRINT_STATUSES: [&str; 5] = ["draft", "proposed", "active", "completed", "cancelled"];

/// Status given to drafts created without an explicit one.
pub const DEFAULT_STATUS: &str = "draft";

/// Status given to drafts created by a package purchase.
pub const PURCHASED_STATUS: &str = "proposed";

/// One ad hoc deliverable choice in a sprint request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableSelection {
    pub deliverable_id: i64,
    pub quantity: Option<i64>,
    pub complexity_score: Option<f64>,
}

/// Request to create a sprint draft.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSprintDraft {
    pub title: String,
    pub sprint_package_id: Option<i64>,
    pub deliverables: Option<Vec<DeliverableSelection>>,
    pub status: Option<String>,
    pub project_id: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

/// A catalog deliverable chosen for a sprint, ready to be snapshotted.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintLine {
    pub deliverable: deliverable::Model,
    pub quantity: i32,
    pub complexity_score: f64,
}

impl From<&package::PackageLine> for SprintLine {
    fn from(line: &package::PackageLine) -> Self {
        Self {
            deliverable: line.deliverable.clone(),
            quantity: line.item.quantity.max(1),
            complexity_score: line.complexity_score(),
        }
    }
}

/// Everything needed to write a sprint draft, after validation and lookups.
#[derive(Debug, Clone)]
pub struct SprintDraftPlan {
    pub title: String,
    pub status: String,
    pub project: project_entity::Model,
    pub sprint_package_id: Option<i64>,
    pub terms: PackageTerms,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub lines: Vec<SprintLine>,
}

/// The rows written for a new sprint draft plus the quote they were priced with.
#[derive(Debug, Clone)]
pub struct CreatedSprint {
    pub draft: sprint_draft::Model,
    pub document: document::Model,
    pub deliverables: Vec<sprint_deliverable::Model>,
    pub quote: Quote,
}

/// A sprint draft with its snapshot rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SprintDraftDetail {
    pub draft: sprint_draft::Model,
    pub deliverables: Vec<sprint_deliverable::Model>,
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("Title is required"));
    }
    Ok(title.to_string())
}

fn validate_status(status: Option<&str>) -> Result<String> {
    let status = status.map_or(DEFAULT_STATUS, str::trim);
    if !SPRINT_STATUSES.contains(&status) {
        return Err(Error::validation(format!("Unknown sprint status '{status}'")));
    }
    Ok(status.to_string())
}

fn validate_dates(start: Option<NaiveDate>, due: Option<NaiveDate>) -> Result<()> {
    if let (Some(start), Some(due)) = (start, due) {
        if due < start {
            return Err(Error::validation("Due date cannot be before start date"));
        }
    }
    Ok(())
}

fn selection_for(line: &SprintLine) -> Selection {
    Selection::new(
        Some(line.deliverable.default_estimate_points),
        Some(i64::from(line.quantity)),
        Some(line.complexity_score),
    )
}

fn selection_for_row(row: &sprint_deliverable::Model) -> Selection {
    Selection::new(
        Some(row.estimate_points),
        Some(i64::from(row.quantity)),
        Some(row.complexity_score),
    )
}

/// Resolves ad hoc selections against the catalog.
///
/// Unknown or inactive deliverables are a validation error naming the offending id.
pub async fn lines_from_selections<C>(
    db: &C,
    selections: &[DeliverableSelection],
) -> Result<Vec<SprintLine>>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = selections.iter().map(|s| s.deliverable_id).collect();
    let catalog = catalog::get_deliverables_by_ids(db, &ids).await?;

    selections
        .iter()
        .map(|selection| {
            let deliverable = catalog
                .get(&selection.deliverable_id)
                .filter(|d| d.active)
                .ok_or_else(|| {
                    Error::validation(format!(
                        "Deliverable {} is not available",
                        selection.deliverable_id
                    ))
                })?;
            Ok(SprintLine {
                deliverable: deliverable.clone(),
                quantity: normalize_quantity(selection.quantity),
                complexity_score: complexity_multiplier(selection.complexity_score)
                    * STANDARD_COMPLEXITY,
            })
        })
        .collect()
}

/// Renders the markdown body of a sprint's backing document.
#[must_use]
pub fn render_sprint_document(title: &str, lines: &[SprintLine], quote: &Quote) -> String {
    let mut body = format!("# {title}\n\n## Deliverables\n\n");
    for line in lines {
        body.push_str(&format!(
            "- {} x{} ({}) - {}\n",
            line.deliverable.name,
            line.quantity,
            line.deliverable.category,
            line.deliverable.scope
        ));
    }
    body.push_str(&format!(
        "\n## Estimate\n\n- Points: {:.1}\n- Weighted points: {:.1}\n- Hours: {:.1}\n- Price: ${:.2}\n",
        quote.totals.points, quote.totals.weighted_points, quote.hours, quote.price
    ));
    body
}

/// Writes a planned sprint: document, draft, snapshot rows, then derived totals.
///
/// Intended to run inside a transaction owned by the caller.
pub async fn insert_sprint_draft<C>(
    db: &C,
    policy: &PricingPolicy,
    created_by: i64,
    plan: SprintDraftPlan,
) -> Result<CreatedSprint>
where
    C: ConnectionTrait,
{
    let planned: Vec<Selection> = plan.lines.iter().map(selection_for).collect();
    let planned_quote = policy.quote(&planned, plan.terms);

    let document = project::create_document(
        db,
        plan.project.id,
        &plan.title,
        document::KIND_SPRINT,
        render_sprint_document(&plan.title, &plan.lines, &planned_quote),
        created_by,
    )
    .await?;

    let now = Utc::now();
    let draft = sprint_draft::ActiveModel {
        project_id: Set(plan.project.id),
        document_id: Set(document.id),
        sprint_package_id: Set(plan.sprint_package_id),
        title: Set(plan.title.clone()),
        status: Set(plan.status.clone()),
        start_date: Set(plan.start_date),
        due_date: Set(plan.due_date),
        total_estimate_points: Set(0.0),
        total_fixed_hours: Set(0.0),
        total_fixed_price: Set(0.0),
        deliverable_count: Set(0),
        created_by: Set(created_by),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut rows = Vec::with_capacity(plan.lines.len());
    for (position, line) in plan.lines.iter().enumerate() {
        let row = sprint_deliverable::ActiveModel {
            sprint_draft_id: Set(draft.id),
            deliverable_id: Set(line.deliverable.id),
            name: Set(line.deliverable.name.clone()),
            description: Set(line.deliverable.description.clone()),
            category: Set(line.deliverable.category.clone()),
            scope: Set(line.deliverable.scope.clone()),
            estimate_points: Set(line.deliverable.default_estimate_points),
            quantity: Set(line.quantity),
            complexity_score: Set(line.complexity_score),
            sort_order: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            ..Default::default()
        }
        .insert(db)
        .await?;
        rows.push(row);
    }

    // Totals come from what was actually written.
    let written: Vec<Selection> = rows.iter().map(selection_for_row).collect();
    let quote = policy.quote(&written, plan.terms);

    let mut totals: sprint_draft::ActiveModel = draft.into();
    totals.total_estimate_points = Set(quote.totals.points);
    totals.total_fixed_hours = Set(round_cents(quote.hours));
    totals.total_fixed_price = Set(round_cents(quote.price));
    totals.deliverable_count = Set(i32::try_from(rows.len()).unwrap_or(i32::MAX));
    totals.updated_at = Set(Utc::now());
    let draft = totals.update(db).await?;

    Ok(CreatedSprint {
        draft,
        document,
        deliverables: rows,
        quote,
    })
}

/// Creates a sprint draft from a package or an ad hoc deliverable list.
///
/// # Errors
/// Returns an error if:
/// - The title is empty, the status is unknown or the due date precedes the start date
/// - Neither (or both) of `sprint_package_id` and a non-empty `deliverables` list is given
/// - A selected deliverable is unknown or inactive (`Error::Validation`)
/// - The package is unknown or inactive (`Error::PackageNotFound`)
/// - The project is unknown or not managed by the actor
#[instrument(skip(db, policy, actor, request), fields(actor = actor.id))]
pub async fn create_sprint_draft(
    db: &DatabaseConnection,
    policy: &PricingPolicy,
    actor: &user::Model,
    request: NewSprintDraft,
) -> Result<CreatedSprint> {
    let title = validate_title(&request.title)?;
    let status = validate_status(request.status.as_deref())?;
    validate_dates(request.start_date, request.due_date)?;

    let selections = request.deliverables.unwrap_or_default();
    match (request.sprint_package_id, selections.is_empty()) {
        (None, true) => {
            return Err(Error::validation(
                "Provide a sprintPackageId or at least one deliverable",
            ));
        }
        (Some(_), false) => {
            return Err(Error::validation(
                "Provide either sprintPackageId or deliverables, not both",
            ));
        }
        _ => {}
    }

    let txn = db.begin().await?;

    let (lines, terms) = match request.sprint_package_id {
        Some(package_id) => {
            let PackageDetail {
                package: pkg,
                lines,
                ..
            } = package::get_package_detail(&txn, policy, &package_id.to_string()).await?;
            (
                lines.iter().map(SprintLine::from).collect(),
                package::package_terms(&pkg),
            )
        }
        None => (
            lines_from_selections(&txn, &selections).await?,
            PackageTerms::default(),
        ),
    };

    let project = project::resolve_or_create_project(&txn, actor, request.project_id, &title).await?;

    let created = insert_sprint_draft(
        &txn,
        policy,
        actor.id,
        SprintDraftPlan {
            title,
            status,
            project,
            sprint_package_id: request.sprint_package_id,
            terms,
            start_date: request.start_date,
            due_date: request.due_date,
            lines,
        },
    )
    .await?;

    txn.commit().await?;
    info!(
        sprint_draft_id = created.draft.id,
        deliverables = created.deliverables.len(),
        price = created.draft.total_fixed_price,
        "Created sprint draft"
    );
    Ok(created)
}

async fn load_deliverables<C>(db: &C, draft_id: i64) -> Result<Vec<sprint_deliverable::Model>>
where
    C: ConnectionTrait,
{
    SprintDeliverable::find()
        .filter(sprint_deliverable::Column::SprintDraftId.eq(draft_id))
        .order_by_asc(sprint_deliverable::Column::SortOrder)
        .order_by_asc(sprint_deliverable::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a sprint draft and its deliverables if the actor can see its project.
///
/// # Errors
/// Returns `Error::SprintDraftNotFound` both for unknown ids and for drafts the actor
/// may not see, so existence is not leaked.
pub async fn get_sprint_draft<C>(
    db: &C,
    actor: &user::Model,
    draft_id: i64,
) -> Result<SprintDraftDetail>
where
    C: ConnectionTrait,
{
    let not_found = || Error::SprintDraftNotFound { id: draft_id };
    let draft = SprintDraft::find_by_id(draft_id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;
    let project = project::get_project(db, draft.project_id)
        .await?
        .ok_or_else(not_found)?;
    if !project::can_view_project(db, actor, &project).await? {
        return Err(not_found());
    }

    let deliverables = load_deliverables(db, draft.id).await?;
    Ok(SprintDraftDetail {
        draft,
        deliverables,
    })
}

/// Retrieves a sprint draft by id without any access check.
pub async fn find_sprint_draft<C>(db: &C, draft_id: i64) -> Result<Option<sprint_draft::Model>>
where
    C: ConnectionTrait,
{
    SprintDraft::find_by_id(draft_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the sprint drafts of a project the actor can see, newest first.
pub async fn list_sprint_drafts_for_project<C>(
    db: &C,
    actor: &user::Model,
    project_id: i64,
) -> Result<Vec<sprint_draft::Model>>
where
    C: ConnectionTrait,
{
    let project = project::get_project(db, project_id)
        .await?
        .ok_or(Error::ProjectNotFound { id: project_id })?;
    if !project::can_view_project(db, actor, &project).await? {
        return Err(Error::forbidden("You do not have access to this project"));
    }

    SprintDraft::find()
        .filter(sprint_draft::Column::ProjectId.eq(project_id))
        .order_by_desc(sprint_draft::Column::CreatedAt)
        .order_by_desc(sprint_draft::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a sprint draft together with its deliverables, daily updates and backing document.
///
/// # Errors
/// Returns `Error::SprintDraftNotFound` if the draft does not exist or the actor does
/// not manage its project.
#[instrument(skip(db, actor), fields(actor = actor.id))]
pub async fn delete_sprint_draft(
    db: &DatabaseConnection,
    actor: &user::Model,
    draft_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    let not_found = || Error::SprintDraftNotFound { id: draft_id };

    let draft = SprintDraft::find_by_id(draft_id)
        .one(&txn)
        .await?
        .ok_or_else(not_found)?;
    let project = project::get_project(&txn, draft.project_id)
        .await?
        .ok_or_else(not_found)?;
    if !project::can_manage_project(actor, &project) {
        return Err(not_found());
    }

    SprintDeliverable::delete_many()
        .filter(sprint_deliverable::Column::SprintDraftId.eq(draft.id))
        .exec(&txn)
        .await?;
    SprintDailyUpdate::delete_many()
        .filter(sprint_daily_update::Column::SprintDraftId.eq(draft.id))
        .exec(&txn)
        .await?;
    let document_id = draft.document_id;
    draft.delete(&txn).await?;
    Document::delete_by_id(document_id)
        .exec(&txn)
        .await?;

    txn.commit().await?;
    info!(sprint_draft_id = draft_id, "Deleted sprint draft");
    Ok(())
}

/// Records a free-text daily update against a sprint draft.
///
/// # Errors
/// Returns `Error::Validation` for an empty body and `Error::SprintDraftNotFound` for
/// an unknown draft.
pub async fn add_daily_update(
    db: &DatabaseConnection,
    author: &user::Model,
    draft_id: i64,
    body: &str,
) -> Result<sprint_daily_update::Model> {
    let body = body.trim();
    if body.is_empty() {
        return Err(Error::validation("Update body cannot be empty"));
    }
    find_sprint_draft(db, draft_id)
        .await?
        .ok_or(Error::SprintDraftNotFound { id: draft_id })?;

    sprint_daily_update::ActiveModel {
        sprint_draft_id: Set(draft_id),
        body: Set(body.to_string()),
        author_id: Set(author.id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Retrieves the daily updates recorded on `date` (UTC), oldest first.
pub async fn get_daily_updates_for_date<C>(
    db: &C,
    draft_id: i64,
    date: NaiveDate,
) -> Result<Vec<sprint_daily_update::Model>>
where
    C: ConnectionTrait,
{
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = start + Duration::days(1);

    SprintDailyUpdate::find()
        .filter(sprint_daily_update::Column::SprintDraftId.eq(draft_id))
        .filter(sprint_daily_update::Column::CreatedAt.gte(start))
        .filter(sprint_daily_update::Column::CreatedAt.lt(end))
        .order_by_asc(sprint_daily_update::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}
