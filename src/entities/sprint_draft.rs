//! Sprint draft entity - A sprint instantiated for a client project.
//!
//! The `total_*` and `deliverable_count` columns are derived from the draft's
//! `sprint_deliverables` rows when the draft is created and are never accepted
//! from callers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sprint draft database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sprint_drafts")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the draft
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project this sprint belongs to
    pub project_id: i64,
    /// Backing document
    pub document_id: i64,
    /// Package the draft was created from, if any
    pub sprint_package_id: Option<i64>,
    /// Sprint title
    pub title: String,
    /// Lifecycle status (`draft`, `proposed`, `active`, `completed`, `cancelled`)
    pub status: String,
    /// Planned start
    pub start_date: Option<Date>,
    /// Planned end
    pub due_date: Option<Date>,
    /// Complexity-weighted points across all deliverables
    pub total_estimate_points: f64,
    /// Estimated hours
    pub total_fixed_hours: f64,
    /// Fixed price quoted to the client
    pub total_fixed_price: f64,
    /// Number of deliverable rows
    pub deliverable_count: i32,
    /// User who created the draft
    pub created_by: i64,
    /// When the draft was created
    pub created_at: DateTimeUtc,
    /// When the draft was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `SprintDraft` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each draft belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
    /// Each draft is backed by one document
    #[sea_orm(
        belongs_to = "super::document::Entity",
        from = "Column::DocumentId",
        to = "super::document::Column::Id"
    )]
    Document,
    /// One draft has many deliverable snapshots
    #[sea_orm(has_many = "super::sprint_deliverable::Entity")]
    Deliverables,
    /// One draft has many daily updates
    #[sea_orm(has_many = "super::sprint_daily_update::Entity")]
    DailyUpdates,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Document.def()
    }
}

impl Related<super::sprint_deliverable::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliverables.def()
    }
}

impl Related<super::sprint_daily_update::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyUpdates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
