//! Document entity - Project documents; every sprint draft is backed by one.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Document kind used for sprint-backing documents.
pub const KIND_SPRINT: &str = "sprint";

/// Document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    /// Document kind, e.g. `"sprint"`
    pub kind: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub created_by: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
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
