//! Deliverable entity - The catalog of sellable units of design/dev output.
//!
//! Catalog rows are templates: selecting one for a sprint snapshots its fields
//! into a `sprint_deliverables` row, so editing the catalog never rewrites history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Deliverable database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deliverables")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the deliverable
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog name (e.g., "Landing page", "Auth flow")
    #[sea_orm(unique)]
    pub name: String,
    /// Client-facing description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Grouping used by the catalog UI (e.g., "design", "engineering")
    pub category: String,
    /// Free-text scope statement
    #[sea_orm(column_type = "Text")]
    pub scope: String,
    /// Complexity estimate in points
    pub default_estimate_points: f64,
    /// Fixed hour estimate shown alongside the catalog entry
    pub fixed_hours: f64,
    /// Fixed standalone price shown alongside the catalog entry
    pub fixed_price: f64,
    /// Inactive deliverables cannot be selected for new sprints
    pub active: bool,
}

/// Defines relationships between Deliverable and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A deliverable appears in many package line items
    #[sea_orm(has_many = "super::sprint_package_deliverable::Entity")]
    PackageItems,
}

impl Related<super::sprint_package_deliverable::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
