//! Project membership.
//!
//! Members are addressed by email, stored lower-cased. Adding is idempotent: the
//! insert uses `ON CONFLICT DO NOTHING` on `(project_id, email)` and the welcome email
//! only goes out when a row was actually written. Notification failures are logged,
//! never returned.

use crate::{
    core::project,
    entities::{ProjectMember, project as project_entity, project_member, user},
    errors::{Error, Result},
    services::mailer::{self, Mailer},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Roles a project member may hold.
pub const MEMBER_ROLES: [&str; 2] = ["viewer", "editor"];

/// Role given when none is requested.
pub const DEFAULT_MEMBER_ROLE: &str = "viewer";

/// Request to add a member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub project_id: i64,
    pub email: String,
    pub role: Option<String>,
}

/// Request to change a member's role.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRoleUpdate {
    pub project_id: i64,
    pub email: String,
    pub role: String,
}

/// Outcome of an add: `added` is false when the member already existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberAddition {
    pub added: bool,
    pub member: project_member::Model,
}

/// Trims, lower-cases and sanity-checks an email address.
///
/// # Errors
/// Returns `Error::Validation` unless the address has a non-empty local part, one `@`,
/// and a dotted domain.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let invalid = || Error::validation(format!("Invalid email address '{email}'"));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok {
        return Err(invalid());
    }
    Ok(email)
}

fn validate_role(role: Option<&str>) -> Result<String> {
    let role = role.map_or(DEFAULT_MEMBER_ROLE, str::trim);
    if !MEMBER_ROLES.contains(&role) {
        return Err(Error::validation(format!("Unknown member role '{role}'")));
    }
    Ok(role.to_string())
}

/// Gate for every membership operation: the actor must be signed in and manage the project.
///
/// # Errors
/// `Error::Unauthorized` without an actor, `Error::ProjectNotFound` for an unknown
/// project, `Error::Forbidden` when the actor is neither owner nor admin.
pub async fn assert_auth<C>(
    db: &C,
    actor: Option<&user::Model>,
    project_id: i64,
) -> Result<project_entity::Model>
where
    C: ConnectionTrait,
{
    let actor = actor.ok_or(Error::Unauthorized)?;
    project::get_managed_project(db, actor, project_id).await
}

async fn find_member<C>(db: &C, project_id: i64, email: &str) -> Result<Option<project_member::Model>>
where
    C: ConnectionTrait,
{
    ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .filter(project_member::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists a project's members in the order they were added.
pub async fn list_members<C>(
    db: &C,
    actor: &user::Model,
    project_id: i64,
) -> Result<Vec<project_member::Model>>
where
    C: ConnectionTrait,
{
    assert_auth(db, Some(actor), project_id).await?;
    ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .order_by_asc(project_member::Column::CreatedAt)
        .order_by_asc(project_member::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a member, sending a welcome email only when the row is new.
pub async fn add_member(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    app_base_url: &str,
    actor: &user::Model,
    request: NewMember,
) -> Result<MemberAddition> {
    let project = assert_auth(db, Some(actor), request.project_id).await?;
    let email = normalize_email(&request.email)?;
    let role = validate_role(request.role.as_deref())?;

    let candidate = project_member::ActiveModel {
        project_id: Set(project.id),
        email: Set(email.clone()),
        role: Set(role.clone()),
        invited_by: Set(actor.id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let inserted = ProjectMember::insert(candidate)
        .on_conflict(
            OnConflict::columns([
                project_member::Column::ProjectId,
                project_member::Column::Email,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let member = find_member(db, project.id, &email)
        .await?
        .ok_or_else(|| Error::MemberNotFound {
            email: email.clone(),
        })?;
    let added = inserted > 0;

    if added {
        info!(project_id = project.id, email = %email, "Added project member");
        let welcome = mailer::member_welcome(&email, &project.name, &member.role, app_base_url);
        if let Err(e) = mailer.send(&welcome).await {
            warn!(error = %e, email = %email, "Failed to send member welcome email");
        }
    }

    Ok(MemberAddition { added, member })
}

/// Changes a member's role.
///
/// # Errors
/// `Error::MemberNotFound` if the email is not a member of the project.
pub async fn update_member_role(
    db: &DatabaseConnection,
    actor: &user::Model,
    request: MemberRoleUpdate,
) -> Result<project_member::Model> {
    let project = assert_auth(db, Some(actor), request.project_id).await?;
    let email = normalize_email(&request.email)?;
    let role = validate_role(Some(&request.role))?;

    let member = find_member(db, project.id, &email)
        .await?
        .ok_or_else(|| Error::MemberNotFound {
            email: email.clone(),
        })?;
    let mut active: project_member::ActiveModel = member.into();
    active.role = Set(role);
    active.update(db).await.map_err(Into::into)
}

/// Removes a member and sends a removal notice.
///
/// # Errors
/// `Error::MemberNotFound` if the email is not a member of the project.
pub async fn remove_member(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    actor: &user::Model,
    project_id: i64,
    email: &str,
) -> Result<()> {
    let project = assert_auth(db, Some(actor), project_id).await?;
    let email = normalize_email(email)?;

    let member = find_member(db, project.id, &email)
        .await?
        .ok_or_else(|| Error::MemberNotFound {
            email: email.clone(),
        })?;
    member.delete(db).await?;
    info!(project_id, email = %email, "Removed project member");

    let notice = mailer::member_removed(&email, &project.name);
    if let Err(e) = mailer.send(&notice).await {
        warn!(error = %e, email = %email, "Failed to send member removal email");
    }
    Ok(())
}
