//! Package business logic - lookup and pricing of curated deliverable bundles.
//!
//! Packages are resolved either by numeric id or by slug. Every priced view of a
//! package (list, detail page, purchase) goes through [`load_package_detail`], so
//! the complexity multiplier and the flat-fee/discount rules live in one place.

use crate::{
    core::pricing::{LineTotals, PackageTerms, PricingPolicy, Quote, STANDARD_COMPLEXITY, Selection},
    entities::{
        Deliverable, SprintPackage, SprintPackageDeliverable, deliverable, sprint_package,
        sprint_package_deliverable,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, prelude::*};

/// One priced line of a package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageLine {
    /// The package line item
    pub item: sprint_package_deliverable::Model,
    /// The catalog deliverable it points to
    pub deliverable: deliverable::Model,
    /// Engine input derived from the two
    pub selection: Selection,
    /// Engine output for this line alone
    pub totals: LineTotals,
}

impl PackageLine {
    /// Complexity score to snapshot for this line; standard when the package has no override.
    #[must_use]
    pub fn complexity_score(&self) -> f64 {
        self.item.complexity_score.unwrap_or(STANDARD_COMPLEXITY)
    }
}

/// A package with its priced lines and quote.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDetail {
    pub package: sprint_package::Model,
    pub lines: Vec<PackageLine>,
    pub quote: Quote,
}

/// Extracts the pricing overrides from a package row.
#[must_use]
pub const fn package_terms(package: &sprint_package::Model) -> PackageTerms {
    PackageTerms {
        flat_fee: package.flat_fee,
        flat_hours: package.flat_hours,
        discount_percentage: package.discount_percentage,
    }
}

/// Finds a package by numeric id, falling back to slug. Inactive packages are included.
pub async fn find_package<C>(db: &C, key: &str) -> Result<Option<sprint_package::Model>>
where
    C: ConnectionTrait,
{
    let key = key.trim();
    if let Ok(id) = key.parse::<i64>() {
        if let Some(package) = SprintPackage::find_by_id(id).one(db).await? {
            return Ok(Some(package));
        }
    }

    SprintPackage::find()
        .filter(sprint_package::Column::Slug.eq(key))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an active package by id or slug.
///
/// # Errors
/// Returns `Error::PackageNotFound` if the package does not exist or is inactive.
pub async fn get_active_package<C>(db: &C, key: &str) -> Result<sprint_package::Model>
where
    C: ConnectionTrait,
{
    find_package(db, key)
        .await?
        .filter(|p| p.active)
        .ok_or_else(|| Error::PackageNotFound {
            key: key.to_string(),
        })
}

/// Loads a package's line items and prices them with `policy`.
pub async fn load_package_detail<C>(
    db: &C,
    policy: &PricingPolicy,
    package: sprint_package::Model,
) -> Result<PackageDetail>
where
    C: ConnectionTrait,
{
    let rows = SprintPackageDeliverable::find()
        .filter(sprint_package_deliverable::Column::SprintPackageId.eq(package.id))
        .order_by_asc(sprint_package_deliverable::Column::SortOrder)
        .order_by_asc(sprint_package_deliverable::Column::Id)
        .find_also_related(Deliverable)
        .all(db)
        .await?;

    let mut lines = Vec::with_capacity(rows.len());
    for (item, deliverable) in rows {
        let deliverable = deliverable.ok_or(Error::DeliverableNotFound {
            id: item.deliverable_id,
        })?;
        let selection = Selection::new(
            Some(deliverable.default_estimate_points),
            Some(i64::from(item.quantity)),
            item.complexity_score,
        );
        lines.push(PackageLine {
            totals: policy.line(&selection),
            item,
            deliverable,
            selection,
        });
    }

    let selections: Vec<Selection> = lines.iter().map(|l| l.selection).collect();
    let quote = policy.quote(&selections, package_terms(&package));

    Ok(PackageDetail {
        package,
        lines,
        quote,
    })
}

/// Loads the priced detail of an active package by id or slug.
///
/// # Errors
/// Returns `Error::PackageNotFound` if the package does not exist or is inactive.
pub async fn get_package_detail<C>(
    db: &C,
    policy: &PricingPolicy,
    key: &str,
) -> Result<PackageDetail>
where
    C: ConnectionTrait,
{
    let package = get_active_package(db, key).await?;
    load_package_detail(db, policy, package).await
}

/// Lists every active package with its quote, ordered by name.
pub async fn list_active_packages<C>(
    db: &C,
    policy: &PricingPolicy,
) -> Result<Vec<PackageDetail>>
where
    C: ConnectionTrait,
{
    let packages = SprintPackage::find()
        .filter(sprint_package::Column::Active.eq(true))
        .order_by_asc(sprint_package::Column::Name)
        .all(db)
        .await?;

    let mut details = Vec::with_capacity(packages.len());
    for package in packages {
        details.push(load_package_detail(db, policy, package).await?);
    }
    Ok(details)
}
