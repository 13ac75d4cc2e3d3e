//! Sprint package entity - A curated bundle of deliverables sold as one unit.
//!
//! `flat_fee`/`flat_hours` override the computed totals outright;
//! `discount_percentage` only applies when no flat fee is set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sprint package database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sprint_packages")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the package
    #[sea_orm(primary_key)]
    pub id: i64,
    /// URL-friendly unique key
    #[sea_orm(unique)]
    pub slug: String,
    /// Display name
    pub name: String,
    /// Marketing description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Exact price override
    pub flat_fee: Option<f64>,
    /// Exact hours override
    pub flat_hours: Option<f64>,
    /// Percentage taken off the computed subtotal (0-100)
    pub discount_percentage: Option<f64>,
    /// Inactive packages are hidden and cannot be purchased
    pub active: bool,
}

/// Defines relationships between `SprintPackage` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One package has many deliverable line items
    #[sea_orm(has_many = "super::sprint_package_deliverable::Entity")]
    Items,
}

impl Related<super::sprint_package_deliverable::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
