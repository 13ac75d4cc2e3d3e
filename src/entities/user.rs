//! User entity - Accounts resolved from bearer session tokens.
//!
//! Sessions are issued elsewhere; this service only reads `session_token`
//! to identify the caller and `role` to decide admin access.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role value that grants admin access.
pub const ROLE_ADMIN: &str = "admin";
/// Role value for regular studio clients.
pub const ROLE_CLIENT: &str = "client";

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login email, stored lower-cased
    #[sea_orm(unique)]
    pub email: String,
    /// Display name used in emails
    pub name: String,
    /// Either `"admin"` or `"client"`
    pub role: String,
    /// Opaque bearer token for the current session
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
}

impl Model {
    /// Whether this user may use admin-only routes.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user owns many projects
    #[sea_orm(has_many = "super::project::Entity")]
    Projects,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Projects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
