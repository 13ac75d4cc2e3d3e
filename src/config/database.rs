//! Database configuration module.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Postgres is the production backend; `SQLite` is supported for local runs and tests.
//! Tables are generated with `Schema::create_table_from_entity` so the schema always
//! matches the entity definitions, and the handful of composite/partial indexes that
//! entity attributes cannot express are created right after.

use crate::entities::{
    AdminTask, AdminTaskEvent, Deliverable, Document, Project, ProjectMember, SprintDailyUpdate,
    SprintDeliverable, SprintDraft, SprintPackage, SprintPackageDeliverable, User,
    project_member,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, Statement};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/meisner.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Creates the parent directory of a file-backed `SQLite` URL so `mode=rwc` can create the file.
///
/// # Errors
/// Returns `Error::Io` if the directory cannot be created.
pub fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = std::path::Path::new(rest.split('?').next().unwrap_or(rest));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Establishes a connection to the database at `database_url`.
///
/// Accepts any URL `SeaORM` understands (`postgres://…`, `sqlite://…`, `sqlite::memory:`).
#[instrument(skip(database_url))]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    let db = Database::connect(database_url).await?;
    info!(backend = ?db.get_database_backend(), "Database connection established");
    Ok(db)
}

/// Creates a table from its entity definition unless it already exists.
async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all necessary database tables and indexes.
///
/// Tables are created parents-first so foreign keys resolve on Postgres.
/// Safe to call on every start.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Project).await?;
    create_table(db, &schema, Document).await?;
    create_table(db, &schema, ProjectMember).await?;
    create_table(db, &schema, Deliverable).await?;
    create_table(db, &schema, SprintPackage).await?;
    create_table(db, &schema, SprintPackageDeliverable).await?;
    create_table(db, &schema, SprintDraft).await?;
    create_table(db, &schema, SprintDeliverable).await?;
    create_table(db, &schema, SprintDailyUpdate).await?;
    create_table(db, &schema, AdminTask).await?;
    create_table(db, &schema, AdminTaskEvent).await?;

    // One membership row per (project, email); member inserts rely on it for ON CONFLICT.
    let member_index = Index::create()
        .name("idx_project_members_project_email")
        .table(ProjectMember)
        .col(project_member::Column::ProjectId)
        .col(project_member::Column::Email)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&member_index)).await?;

    // At most one task studio-wide may be the current focus.
    db.execute(Statement::from_string(
        builder,
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_admin_tasks_single_focus_now \
         ON admin_tasks (focus) WHERE focus = 'now'",
    ))
    .await?;

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        AdminTask, DeliverableModel, ProjectMemberModel, SprintDraftModel, admin_task,
    };
    use chrono::Utc;
    use sea_orm::{ActiveModelTrait, QuerySelect, Set};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<DeliverableModel> = Deliverable::find().limit(1).all(&db).await?;
        let _: Vec<SprintDraftModel> = SprintDraft::find().limit(1).all(&db).await?;
        let _: Vec<ProjectMemberModel> = ProjectMember::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_focus_now_index_rejects_second_now() -> Result<()> {
        let db = create_connection("sqlite::memory:").await?;
        create_tables(&db).await?;

        let now = Utc::now();
        let task = |title: &str| admin_task::ActiveModel {
            title: Set(title.to_string()),
            description: Set(String::new()),
            status: Set("todo".to_string()),
            focus: Set("now".to_string()),
            sort_order: Set(0),
            sub_sort_order: Set(0),
            parent_id: Set(None),
            project_id: Set(None),
            due_date: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        task("first").insert(&db).await?;
        let second = task("second").insert(&db).await;
        assert!(second.is_err());
        assert_eq!(AdminTask::find().all(&db).await?.len(), 1);
        Ok(())
    }
}
