//! Admin task entity - Rows on the studio's internal task board.
//!
//! Top-level tasks are ordered by `sort_order`; subtasks share their parent's
//! `sort_order` and are ordered among themselves by `sub_sort_order`.
//! At most one task studio-wide may carry `focus = "now"`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Focus value marking the single task being worked on right now.
pub const FOCUS_NOW: &str = "now";

/// Admin task database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "admin_tasks")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the task
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short task title
    pub title: String,
    /// Longer notes
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// `todo`, `in_progress` or `done`
    pub status: String,
    /// Empty, `now` or `next`
    pub focus: String,
    /// Position among top-level tasks
    pub sort_order: i32,
    /// Position among siblings under the same parent
    pub sub_sort_order: i32,
    /// Parent task for subtasks
    pub parent_id: Option<i64>,
    /// Optional project link
    pub project_id: Option<i64>,
    /// Optional due date
    pub due_date: Option<Date>,
    /// When the task was created
    pub created_at: DateTimeUtc,
    /// When the task was last modified
    pub updated_at: DateTimeUtc,
}

/// Tasks are linked to their events by id only; the event log outlives deleted tasks.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
