//! Project and document business logic.
//!
//! Projects are the unit of ownership: sprint drafts, documents and members all
//! hang off one. Functions here are generic over `ConnectionTrait` so the sprint
//! and purchase flows can call them inside their transactions.

use crate::{
    entities::{Project, ProjectMember, document, project, project_member, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};

/// Retrieves a project by id.
pub async fn get_project<C>(db: &C, project_id: i64) -> Result<Option<project::Model>>
where
    C: ConnectionTrait,
{
    Project::find_by_id(project_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a project owned by `owner_id`.
///
/// # Errors
/// Returns `Error::Validation` for an empty name.
pub async fn create_project<C>(db: &C, name: &str, owner_id: i64) -> Result<project::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Project name cannot be empty"));
    }

    project::ActiveModel {
        name: Set(name.to_string()),
        owner_id: Set(owner_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Whether `actor` may change the project: its owner or any admin.
#[must_use]
pub fn can_manage_project(actor: &user::Model, project: &project::Model) -> bool {
    actor.is_admin() || project.owner_id == actor.id
}

/// Whether `actor` may read the project: managers plus invited members.
pub async fn can_view_project<C>(
    db: &C,
    actor: &user::Model,
    project: &project::Model,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    if can_manage_project(actor, project) {
        return Ok(true);
    }
    let membership = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project.id))
        .filter(project_member::Column::Email.eq(actor.email.to_lowercase()))
        .one(db)
        .await?;
    Ok(membership.is_some())
}

/// Loads a project the actor is allowed to manage.
///
/// # Errors
/// Returns `Error::ProjectNotFound` for an unknown id and `Error::Forbidden` when the
/// actor is neither the owner nor an admin.
pub async fn get_managed_project<C>(
    db: &C,
    actor: &user::Model,
    project_id: i64,
) -> Result<project::Model>
where
    C: ConnectionTrait,
{
    let project = get_project(db, project_id)
        .await?
        .ok_or(Error::ProjectNotFound { id: project_id })?;
    if !can_manage_project(actor, &project) {
        return Err(Error::forbidden("You do not have access to this project"));
    }
    Ok(project)
}

/// Returns the requested project if the actor manages it, or creates a new project
/// named `fallback_name` for the actor when no id is given.
pub async fn resolve_or_create_project<C>(
    db: &C,
    actor: &user::Model,
    project_id: Option<i64>,
    fallback_name: &str,
) -> Result<project::Model>
where
    C: ConnectionTrait,
{
    match project_id {
        Some(id) => get_managed_project(db, actor, id).await,
        None => create_project(db, fallback_name, actor.id).await,
    }
}

/// Creates a document in a project.
pub async fn create_document<C>(
    db: &C,
    project_id: i64,
    title: &str,
    kind: &str,
    body: String,
    created_by: i64,
) -> Result<document::Model>
where
    C: ConnectionTrait,
{
    document::ActiveModel {
        project_id: Set(project_id),
        title: Set(title.to_string()),
        kind: Set(kind.to_string()),
        body: Set(body),
        created_by: Set(created_by),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_project_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner@example.com", "client").await?;

        let result = create_project(&db, "  ", owner.id).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_or_create_project() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner@example.com", "client").await?;
        let other = create_test_user(&db, "other@example.com", "client").await?;
        let admin = create_test_user(&db, "admin@example.com", "admin").await?;

        let created = resolve_or_create_project(&db, &owner, None, "New site").await?;
        assert_eq!(created.name, "New site");
        assert_eq!(created.owner_id, owner.id);

        let reused = resolve_or_create_project(&db, &owner, Some(created.id), "x").await?;
        assert_eq!(reused, created);

        let by_admin = resolve_or_create_project(&db, &admin, Some(created.id), "x").await?;
        assert_eq!(by_admin.id, created.id);

        let forbidden = resolve_or_create_project(&db, &other, Some(created.id), "x").await;
        assert!(matches!(forbidden.unwrap_err(), Error::Forbidden { .. }));

        let missing = resolve_or_create_project(&db, &owner, Some(999), "x").await;
        assert!(matches!(
            missing.unwrap_err(),
            Error::ProjectNotFound { id: 999 }
        ));

        assert_eq!(Project::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_members_can_view_but_not_manage() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner@example.com", "client").await?;
        let guest = create_test_user(&db, "Guest@Example.com", "client").await?;
        let project = create_project(&db, "Site", owner.id).await?;

        assert!(!can_view_project(&db, &guest, &project).await?);
        add_test_member(&db, project.id, "guest@example.com", owner.id).await?;

        assert!(can_view_project(&db, &guest, &project).await?);
        assert!(!can_manage_project(&guest, &project));
        Ok(())
    }
}
