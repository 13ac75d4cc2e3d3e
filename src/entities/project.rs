//! Project entity - A client engagement that sprints, documents and members hang off.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the project
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable project name
    pub name: String,
    /// User who owns the project (the paying client)
    pub owner_id: i64,
    /// When the project was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Project and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each project belongs to one owner
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id"
    )]
    Owner,
    /// One project has many members
    #[sea_orm(has_many = "super::project_member::Entity")]
    Members,
    /// One project has many sprint drafts
    #[sea_orm(has_many = "super::sprint_draft::Entity")]
    SprintDrafts,
    /// One project has many documents
    #[sea_orm(has_many = "super::document::Entity")]
    Documents,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::project_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::sprint_draft::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SprintDrafts.def()
    }
}

impl Related<super::document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
