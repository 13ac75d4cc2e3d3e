//! Sprint deliverable entity - A catalog deliverable snapshotted into a sprint.
//!
//! Name, description, category, scope and points are copied at selection time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sprint deliverable database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sprint_deliverables")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sprint_draft_id: i64,
    /// Catalog row the snapshot was taken from
    pub deliverable_id: i64,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: String,
    #[sea_orm(column_type = "Text")]
    pub scope: String,
    /// Base points at selection time
    pub estimate_points: f64,
    pub quantity: i32,
    /// 2.5 is standard complexity
    pub complexity_score: f64,
    pub sort_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sprint_draft::Entity",
        from = "Column::SprintDraftId",
        to = "super::sprint_draft::Column::Id"
    )]
    SprintDraft,
}

impl Related<super::sprint_draft::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SprintDraft.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
