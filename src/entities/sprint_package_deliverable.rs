//! Package line item - Joins a package to a catalog deliverable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Package line item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sprint_package_deliverables")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sprint_package_id: i64,
    pub deliverable_id: i64,
    /// How many of the deliverable the package includes
    pub quantity: i32,
    /// Display order within the package
    pub sort_order: i32,
    /// Complexity override; 2.5 is standard
    pub complexity_score: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sprint_package::Entity",
        from = "Column::SprintPackageId",
        to = "super::sprint_package::Column::Id"
    )]
    Package,
    #[sea_orm(
        belongs_to = "super::deliverable::Entity",
        from = "Column::DeliverableId",
        to = "super::deliverable::Column::Id"
    )]
    Deliverable,
}

impl Related<super::sprint_package::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Package.def()
    }
}

impl Related<super::deliverable::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliverable.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
