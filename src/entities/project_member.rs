//! Project member entity - Email-addressed collaborators invited to a project.
//!
//! `(project_id, email)` is unique; the index is created alongside the table in
//! [`crate::config::database::create_tables`] so inserts can use `ON CONFLICT DO NOTHING`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Project member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_members")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the membership
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Project the member belongs to
    pub project_id: i64,
    /// Member email, stored lower-cased
    pub email: String,
    /// `"viewer"` or `"editor"`
    pub role: String,
    /// User who added the member
    pub invited_by: i64,
    /// When the member was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ProjectMember` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each membership belongs to one project
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
