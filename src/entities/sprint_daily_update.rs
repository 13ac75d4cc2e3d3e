//! Daily update entity - Free-text progress notes fed into the daily summary.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sprint_daily_updates")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sprint_draft_id: i64,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub author_id: i64,
    pub created_at: DateTimeUtc,
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
