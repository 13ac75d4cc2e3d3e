//! Deliverable catalog business logic.
//!
//! This module provides functions for listing, creating and editing catalog
//! deliverables, and for seeding the catalog and packages from `config.toml`.
//! Catalog rows are read-only at sprint-creation time: sprints snapshot them.

use crate::{
    config::settings::Settings,
    entities::{Deliverable, SprintPackage, deliverable, sprint_package, sprint_package_deliverable},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Input for creating a catalog deliverable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeliverable {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub scope: String,
    pub default_estimate_points: f64,
    #[serde(default)]
    pub fixed_hours: f64,
    #[serde(default)]
    pub fixed_price: f64,
}

/// Partial update for a catalog deliverable; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverableUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub scope: Option<String>,
    pub default_estimate_points: Option<f64>,
    pub fixed_hours: Option<f64>,
    pub fixed_price: Option<f64>,
    pub active: Option<bool>,
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("Deliverable name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn validate_amount(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(value)
}

/// Retrieves all active deliverables, ordered by category then name.
pub async fn get_active_deliverables<C>(db: &C) -> Result<Vec<deliverable::Model>>
where
    C: ConnectionTrait,
{
    Deliverable::find()
        .filter(deliverable::Column::Active.eq(true))
        .order_by_asc(deliverable::Column::Category)
        .order_by_asc(deliverable::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads the given deliverables by id, keyed by id.
///
/// Missing ids are simply absent from the map; callers decide whether that is an error.
pub async fn get_deliverables_by_ids<C>(
    db: &C,
    ids: &[i64],
) -> Result<HashMap<i64, deliverable::Model>>
where
    C: ConnectionTrait,
{
    let rows = Deliverable::find()
        .filter(deliverable::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|d| (d.id, d)).collect())
}

/// Creates a new active deliverable, performing input validation.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - Another deliverable already has the name
/// - Points, hours or price are negative or not finite
/// - The database insert fails
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_deliverable(
    db: &DatabaseConnection,
    input: NewDeliverable,
) -> Result<deliverable::Model> {
    let name = validate_name(&input.name)?;
    let points = validate_amount("defaultEstimatePoints", input.default_estimate_points)?;
    let fixed_hours = validate_amount("fixedHours", input.fixed_hours)?;
    let fixed_price = validate_amount("fixedPrice", input.fixed_price)?;

    let duplicate = Deliverable::find()
        .filter(deliverable::Column::Name.eq(name.as_str()))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(Error::validation(format!(
            "A deliverable named '{name}' already exists"
        )));
    }

    let deliverable = deliverable::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        category: Set(input.category.trim().to_string()),
        scope: Set(input.scope),
        default_estimate_points: Set(points),
        fixed_hours: Set(fixed_hours),
        fixed_price: Set(fixed_price),
        active: Set(true),
        ..Default::default()
    };

    let created = deliverable.insert(db).await?;
    info!(id = created.id, "Created catalog deliverable");
    Ok(created)
}

/// Applies a partial update to a deliverable.
///
/// Existing sprints are unaffected: they hold snapshots.
///
/// # Errors
/// Returns `Error::DeliverableNotFound` for an unknown id and `Error::Validation`
/// for invalid field values.
pub async fn update_deliverable(
    db: &DatabaseConnection,
    id: i64,
    update: DeliverableUpdate,
) -> Result<deliverable::Model> {
    let mut model: deliverable::ActiveModel = Deliverable::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::DeliverableNotFound { id })?
        .into();

    if let Some(name) = update.name {
        model.name = Set(validate_name(&name)?);
    }
    if let Some(description) = update.description {
        model.description = Set(description);
    }
    if let Some(category) = update.category {
        model.category = Set(category.trim().to_string());
    }
    if let Some(scope) = update.scope {
        model.scope = Set(scope);
    }
    if let Some(points) = update.default_estimate_points {
        model.default_estimate_points = Set(validate_amount("defaultEstimatePoints", points)?);
    }
    if let Some(hours) = update.fixed_hours {
        model.fixed_hours = Set(validate_amount("fixedHours", hours)?);
    }
    if let Some(price) = update.fixed_price {
        model.fixed_price = Set(validate_amount("fixedPrice", price)?);
    }
    if let Some(active) = update.active {
        model.active = Set(active);
    }

    model.update(db).await.map_err(Into::into)
}

/// Summary of a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Deliverables inserted by this run
    pub deliverables_created: usize,
    /// Packages inserted by this run
    pub packages_created: usize,
}

/// Seeds catalog deliverables and packages from settings.
///
/// Existing deliverables (matched by name) and packages (matched by slug) are left
/// untouched, so admin edits made through the API survive restarts. Runs in a
/// single transaction.
///
/// # Errors
/// Returns `Error::Config` when a package item references a deliverable name that is
/// neither in the database nor in the seed, or when a seed value is invalid.
#[instrument(skip(db, settings))]
pub async fn seed_catalog(db: &DatabaseConnection, settings: &Settings) -> Result<SeedReport> {
    let txn = db.begin().await?;
    let mut report = SeedReport::default();

    for seed in &settings.deliverables {
        let existing = Deliverable::find()
            .filter(deliverable::Column::Name.eq(seed.name.trim()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            debug!("Deliverable '{}' already exists. Skipping.", seed.name);
            continue;
        }

        let config_error = |e: Error| Error::Config {
            message: format!("deliverable '{}': {e}", seed.name),
        };
        deliverable::ActiveModel {
            name: Set(validate_name(&seed.name).map_err(config_error)?),
            description: Set(seed.description.clone()),
            category: Set(seed.category.clone()),
            scope: Set(seed.scope.clone()),
            default_estimate_points: Set(validate_amount("points", seed.points)
                .map_err(config_error)?),
            fixed_hours: Set(seed.fixed_hours),
            fixed_price: Set(seed.fixed_price),
            active: Set(seed.active),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        report.deliverables_created += 1;
    }

    for seed in &settings.packages {
        let existing = SprintPackage::find()
            .filter(sprint_package::Column::Slug.eq(seed.slug.as_str()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            debug!("Package '{}' already exists. Skipping.", seed.slug);
            continue;
        }

        let package = sprint_package::ActiveModel {
            slug: Set(seed.slug.clone()),
            name: Set(seed.name.clone()),
            description: Set(seed.description.clone()),
            flat_fee: Set(seed.flat_fee),
            flat_hours: Set(seed.flat_hours),
            discount_percentage: Set(seed.discount_percentage),
            active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for (position, item) in seed.items.iter().enumerate() {
            let deliverable = Deliverable::find()
                .filter(deliverable::Column::Name.eq(item.deliverable.as_str()))
                .one(&txn)
                .await?
                .ok_or_else(|| Error::Config {
                    message: format!(
                        "package '{}' references unknown deliverable '{}'",
                        seed.slug, item.deliverable
                    ),
                })?;

            sprint_package_deliverable::ActiveModel {
                sprint_package_id: Set(package.id),
                deliverable_id: Set(deliverable.id),
                quantity: Set(item.quantity.max(1)),
                sort_order: Set(i32::try_from(position).unwrap_or(i32::MAX)),
                complexity_score: Set(item.complexity_score),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        report.packages_created += 1;
    }

    txn.commit().await?;
    info!(
        deliverables = report.deliverables_created,
        packages = report.packages_created,
        "Catalog seeded"
    );
    Ok(report)
}
