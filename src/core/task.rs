//! Admin task board.
//!
//! Top-level tasks are ordered by `sort_order`; subtasks carry their parent's
//! `sort_order` and are ordered among siblings by `sub_sort_order`. Only one task
//! studio-wide may have `focus = "now"`: moving the focus clears the old one and sets
//! the new one in a single transaction, with a partial unique index as backstop.
//!
//! Every mutation appends to `admin_task_events` after it commits. The event log is
//! best effort; a failed append is logged and the mutation still succeeds.

use crate::{
    entities::{AdminTask, admin_task, admin_task_event, user},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Allowed task statuses.
pub const TASK_STATUSES: [&str; 3] = ["todo", "in_progress", "done"];

/// Allowed focus values; the empty string means unfocused.
pub const TASK_FOCUS_VALUES: [&str; 3] = ["", admin_task::FOCUS_NOW, "next"];

/// Request to create a task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub focus: Option<String>,
    pub parent_id: Option<i64>,
    pub project_id: Option<i64>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update of a task; only the fields present are changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub focus: Option<String>,
    pub sort_order: Option<i32>,
    pub sub_sort_order: Option<i32>,
    pub due_date: Option<NaiveDate>,
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("Task title is required"));
    }
    Ok(title.to_string())
}

fn validate_status(status: &str) -> Result<String> {
    let status = status.trim();
    if !TASK_STATUSES.contains(&status) {
        return Err(Error::validation(format!("Unknown task status '{status}'")));
    }
    Ok(status.to_string())
}

fn validate_focus(focus: &str) -> Result<String> {
    let focus = focus.trim();
    if !TASK_FOCUS_VALUES.contains(&focus) {
        return Err(Error::validation(format!("Unknown task focus '{focus}'")));
    }
    Ok(focus.to_string())
}

/// Appends an event; failures are logged, never returned.
async fn record_event(
    db: &DatabaseConnection,
    task_id: i64,
    event_type: &str,
    detail: serde_json::Value,
    actor_id: i64,
) {
    let event = admin_task_event::ActiveModel {
        task_id: Set(task_id),
        event_type: Set(event_type.to_string()),
        detail: Set(detail.to_string()),
        actor_id: Set(actor_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Err(e) = event.insert(db).await {
        warn!(task_id, event_type, error = %e, "Failed to record task event");
    }
}

/// Clears `focus = "now"` from every task except `keep`.
async fn clear_focus_now<C>(db: &C, keep: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = AdminTask::update_many()
        .col_expr(admin_task::Column::Focus, Expr::value(""))
        .col_expr(admin_task::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(admin_task::Column::Focus.eq(admin_task::FOCUS_NOW));
    if let Some(id) = keep {
        query = query.filter(admin_task::Column::Id.ne(id));
    }
    query.exec(db).await?;
    Ok(())
}

/// Lists every task in board order.
pub async fn list_tasks<C>(db: &C) -> Result<Vec<admin_task::Model>>
where
    C: ConnectionTrait,
{
    AdminTask::find()
        .order_by_asc(admin_task::Column::SortOrder)
        .order_by_asc(admin_task::Column::SubSortOrder)
        .order_by_asc(admin_task::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a task by id.
pub async fn get_task<C>(db: &C, task_id: i64) -> Result<admin_task::Model>
where
    C: ConnectionTrait,
{
    AdminTask::find_by_id(task_id)
        .one(db)
        .await?
        .ok_or(Error::TaskNotFound { id: task_id })
}

/// Creates a task at the end of the board, or at the end of its parent's subtasks.
///
/// # Errors
/// `Error::Validation` for an empty title, an unknown status or focus, or a
/// `parent_id` that does not exist or is itself a subtask.
#[instrument(skip(db, actor, request), fields(actor = actor.id))]
pub async fn create_task(
    db: &DatabaseConnection,
    actor: &user::Model,
    request: NewTask,
) -> Result<admin_task::Model> {
    let title = validate_title(&request.title)?;
    let status = validate_status(request.status.as_deref().unwrap_or("todo"))?;
    let focus = validate_focus(request.focus.as_deref().unwrap_or(""))?;

    let txn = db.begin().await?;

    let (sort_order, sub_sort_order) = match request.parent_id {
        Some(parent_id) => {
            let parent = AdminTask::find_by_id(parent_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    Error::validation(format!("Parent task {parent_id} does not exist"))
                })?;
            // Subtasks are one level deep.
            if parent.parent_id.is_some() {
                return Err(Error::validation(format!(
                    "Task {parent_id} is a subtask and cannot have subtasks"
                )));
            }
            let last_sibling = AdminTask::find()
                .filter(admin_task::Column::ParentId.eq(parent_id))
                .order_by_desc(admin_task::Column::SubSortOrder)
                .one(&txn)
                .await?;
            (
                parent.sort_order,
                last_sibling.map_or(0, |t| t.sub_sort_order + 1),
            )
        }
        None => {
            let last = AdminTask::find()
                .filter(admin_task::Column::ParentId.is_null())
                .order_by_desc(admin_task::Column::SortOrder)
                .one(&txn)
                .await?;
            (last.map_or(0, |t| t.sort_order + 1), 0)
        }
    };

    if focus == admin_task::FOCUS_NOW {
        clear_focus_now(&txn, None).await?;
    }

    let now = Utc::now();
    let task = admin_task::ActiveModel {
        title: Set(title),
        description: Set(request.description.unwrap_or_default()),
        status: Set(status),
        focus: Set(focus),
        sort_order: Set(sort_order),
        sub_sort_order: Set(sub_sort_order),
        parent_id: Set(request.parent_id),
        project_id: Set(request.project_id),
        due_date: Set(request.due_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(task_id = task.id, "Created admin task");
    record_event(db, task.id, "created", json!({ "title": task.title }), actor.id).await;
    Ok(task)
}

/// Applies a partial update. Setting `focus = "now"` moves the studio-wide focus.
///
/// # Errors
/// `Error::TaskNotFound` for an unknown id, `Error::Validation` for bad field values.
#[instrument(skip(db, actor, update), fields(actor = actor.id, task_id = update.id))]
pub async fn update_task(
    db: &DatabaseConnection,
    actor: &user::Model,
    update: TaskUpdate,
) -> Result<admin_task::Model> {
    let title = update.title.as_deref().map(validate_title).transpose()?;
    let status = update.status.as_deref().map(validate_status).transpose()?;
    let focus = update.focus.as_deref().map(validate_focus).transpose()?;

    let txn = db.begin().await?;
    let existing = get_task(&txn, update.id).await?;
    let previous_focus = existing.focus.clone();

    if focus.as_deref() == Some(admin_task::FOCUS_NOW) {
        clear_focus_now(&txn, Some(existing.id)).await?;
    }

    let mut active: admin_task::ActiveModel = existing.into();
    if let Some(title) = title {
        active.title = Set(title);
    }
    if let Some(description) = update.description {
        active.description = Set(description);
    }
    if let Some(status) = status {
        active.status = Set(status);
    }
    if let Some(focus) = focus.clone() {
        active.focus = Set(focus);
    }
    if let Some(sort_order) = update.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(sub_sort_order) = update.sub_sort_order {
        active.sub_sort_order = Set(sub_sort_order);
    }
    if let Some(due_date) = update.due_date {
        active.due_date = Set(Some(due_date));
    }
    active.updated_at = Set(Utc::now());
    let task = active.update(&txn).await?;

    txn.commit().await?;

    record_event(db, task.id, "updated", json!({ "status": task.status }), actor.id).await;
    if let Some(focus) = focus.filter(|f| *f != previous_focus) {
        record_event(
            db,
            task.id,
            "focus_changed",
            json!({ "from": previous_focus, "to": focus }),
            actor.id,
        )
        .await;
    }
    Ok(task)
}

/// Deletes a task and its subtasks.
///
/// # Errors
/// `Error::TaskNotFound` for an unknown id.
#[instrument(skip(db, actor), fields(actor = actor.id))]
pub async fn delete_task(db: &DatabaseConnection, actor: &user::Model, task_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let task = get_task(&txn, task_id).await?;

    let subtasks = AdminTask::delete_many()
        .filter(admin_task::Column::ParentId.eq(task.id))
        .exec(&txn)
        .await?;
    task.delete(&txn).await?;
    txn.commit().await?;

    info!(task_id, subtasks = subtasks.rows_affected, "Deleted admin task");
    record_event(
        db,
        task_id,
        "deleted",
        json!({ "subtasks": subtasks.rows_affected }),
        actor.id,
    )
    .await;
    Ok(())
}

/// Rewrites `sort_order` to follow `ids`, moving each task's subtasks along with it.
///
/// # Errors
/// `Error::Validation` for an empty list, duplicate ids or ids that do not exist.
#[instrument(skip(db, actor, ids), fields(actor = actor.id, count = ids.len()))]
pub async fn reorder_tasks(
    db: &DatabaseConnection,
    actor: &user::Model,
    ids: &[i64],
) -> Result<Vec<admin_task::Model>> {
    if ids.is_empty() {
        return Err(Error::validation("ids cannot be empty"));
    }
    let unique: HashSet<i64> = ids.iter().copied().collect();
    if unique.len() != ids.len() {
        return Err(Error::validation("ids contain duplicates"));
    }

    let txn = db.begin().await?;
    let found = AdminTask::find()
        .filter(admin_task::Column::Id.is_in(ids.iter().copied()))
        .all(&txn)
        .await?;
    if found.len() != ids.len() {
        let known: HashSet<i64> = found.iter().map(|t| t.id).collect();
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !known.contains(id))
            .map(ToString::to_string)
            .collect();
        return Err(Error::validation(format!(
            "Unknown task ids: {}",
            missing.join(", ")
        )));
    }

    let now = Utc::now();
    for (position, &id) in ids.iter().enumerate() {
        let sort_order = i32::try_from(position).unwrap_or(i32::MAX);
        AdminTask::update_many()
            .col_expr(admin_task::Column::SortOrder, Expr::value(sort_order))
            .col_expr(admin_task::Column::UpdatedAt, Expr::value(now))
            .filter(
                admin_task::Column::Id
                    .eq(id)
                    .or(admin_task::Column::ParentId.eq(id)),
            )
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    for (position, &id) in ids.iter().enumerate() {
        record_event(db, id, "reordered", json!({ "sortOrder": position }), actor.id).await;
    }
    list_tasks(db).await
}

/// Lists the events recorded for a task, oldest first.
pub async fn get_task_events<C>(db: &C, task_id: i64) -> Result<Vec<admin_task_event::Model>>
where
    C: ConnectionTrait,
{
    crate::entities::AdminTaskEvent::find()
        .filter(admin_task_event::Column::TaskId.eq(task_id))
        .order_by_asc(admin_task_event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn titled(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            ..NewTask::default()
        }
    }

    #[tokio::test]
    async fn test_create_task_sort_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_user(&db, "admin@example.com", "admin").await?;

        let first = create_task(&db, &admin, titled("Invoice Acme")).await?;
        let second = create_task(&db, &admin, titled("Prep kickoff")).await?;
        assert_eq!(first.sort_order, 0);
        assert_eq!(second.sort_order, 1);
        assert_eq!(first.status, "todo");

        let sub_a = create_task(
            &db,
            &admin,
            NewTask {
                parent_id: Some(first.id),
                ..titled("Collect hours")
            },
        )
        .await?;
        let sub_b = create_task(
            &db,
            &admin,
            NewTask {
                parent_id: Some(first.id),
                ..titled("Send PDF")
            },
        )
        .await?;
        assert_eq!(sub_a.sort_order, first.sort_order);
        assert_eq!((sub_a.sub_sort_order, sub_b.sub_sort_order), (0, 1));

        let third = create_task(&db, &admin, titled("Top level again")).await?;
        assert_eq!(third.sort_order, 2);

        let orphan = create_task(
            &db,
            &admin,
            NewTask {
                parent_id: Some(999),
                ..titled("Orphan")
            },
        )
        .await;
        assert!(matches!(orphan.unwrap_err(), Error::Validation { .. }));

        let events = get_task_events(&db, first.id).await?;
        assert_eq!(events[0].event_type, "created");
        Ok(())
    }

    #[tokio::test]
    async fn test_focus_now_is_exclusive() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_user(&db, "admin@example.com", "admin").await?;
        let a = create_task(
            &db,
            &admin,
            NewTask {
                focus: Some("now".to_string()),
                ..titled("A")
            },
        )
        .await?;
        let b = create_task(&db, &admin, titled("B")).await?;

        update_task(
            &db,
            &admin,
            TaskUpdate {
                id: b.id,
                focus: Some("now".to_string()),
                ..TaskUpdate::default()
            },
        )
        .await?;

        let tasks = list_tasks(&db).await?;
        let focused: Vec<i64> = tasks
            .iter()
            .filter(|t| t.focus == admin_task::FOCUS_NOW)
            .map(|t| t.id)
            .collect();
        assert_eq!(focused, vec![b.id]);
        assert_eq!(get_task(&db, a.id).await?.focus, "");

        let events = get_task_events(&db, b.id).await?;
        assert!(events.iter().any(|e| e.event_type == "focus_changed"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_task_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_user(&db, "admin@example.com", "admin").await?;
        let task = create_task(&db, &admin, titled("A")).await?;

        let bad = update_task(
            &db,
            &admin,
            TaskUpdate {
                id: task.id,
                status: Some("blocked".to_string()),
                ..TaskUpdate::default()
            },
        )
        .await;
        assert!(matches!(bad.unwrap_err(), Error::Validation { .. }));

        let missing = update_task(
            &db,
            &admin,
            TaskUpdate {
                id: 404,
                ..TaskUpdate::default()
            },
        )
        .await;
        assert!(matches!(missing.unwrap_err(), Error::TaskNotFound { id: 404 }));

        let done = update_task(
            &db,
            &admin,
            TaskUpdate {
                id: task.id,
                status: Some("done".to_string()),
                due_date: NaiveDate::from_ymd_opt(2026, 11, 2),
                ..TaskUpdate::default()
            },
        )
        .await?;
        assert_eq!(done.status, "done");
        assert_eq!(done.due_date, NaiveDate::from_ymd_opt(2026, 11, 2));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_task_removes_subtasks() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_user(&db, "admin@example.com", "admin").await?;
        let parent = create_task(&db, &admin, titled("Parent")).await?;
        create_task(
            &db,
            &admin,
            NewTask {
                parent_id: Some(parent.id),
                ..titled("Child")
            },
        )
        .await?;
        let keep = create_task(&db, &admin, titled("Keep")).await?;

        delete_task(&db, &admin, parent.id).await?;
        let remaining: Vec<i64> = list_tasks(&db).await?.iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![keep.id]);

        let missing = delete_task(&db, &admin, parent.id).await;
        assert!(matches!(missing.unwrap_err(), Error::TaskNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_subtasks_cannot_nest() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_user(&db, "admin@example.com", "admin").await?;
        let parent = create_task(&db, &admin, titled("Parent")).await?;
        let child = create_task(
            &db,
            &admin,
            NewTask {
                parent_id: Some(parent.id),
                ..titled("Child")
            },
        )
        .await?;

        let grandchild = create_task(
            &db,
            &admin,
            NewTask {
                parent_id: Some(child.id),
                ..titled("Grandchild")
            },
        )
        .await;
        assert!(matches!(grandchild.unwrap_err(), Error::Validation { .. }));

        delete_task(&db, &admin, parent.id).await?;
        assert!(list_tasks(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reorder_tasks() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_user(&db, "admin@example.com", "admin").await?;
        let a = create_task(&db, &admin, titled("A")).await?;
        let b = create_task(&db, &admin, titled("B")).await?;
        let child = create_task(
            &db,
            &admin,
            NewTask {
                parent_id: Some(a.id),
                ..titled("A.1")
            },
        )
        .await?;

        let tasks = reorder_tasks(&db, &admin, &[b.id, a.id]).await?;
        let order: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![b.id, a.id, child.id]);
        assert_eq!(get_task(&db, child.id).await?.sort_order, 1);

        let unknown = reorder_tasks(&db, &admin, &[a.id, 999]).await;
        assert!(matches!(unknown.unwrap_err(), Error::Validation { .. }));
        let dupes = reorder_tasks(&db, &admin, &[a.id, a.id]).await;
        assert!(matches!(dupes.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }
}
