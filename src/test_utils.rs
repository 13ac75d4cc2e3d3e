//! Shared test utilities for the sprint service.
//!
//! This module provides common helper functions for setting up test databases,
//! creating test entities with sensible defaults, and recording fakes for the
//! mailer and the summary composer.

use crate::{
    core::catalog::{self, NewDeliverable},
    entities::{self, deliverable, project_member, sprint_package, sprint_package_deliverable, user},
    errors::{Error, Result},
    services::{
        mailer::{Email, Mailer},
        openai::{SummaryComposer, SummaryDraft},
    },
};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::sync::Mutex;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Session token given to the test user with this email.
pub fn session_token(email: &str) -> String {
    format!("session-{}", email.to_lowercase())
}

/// Builds a user model without touching a database, for validation-only tests.
pub fn test_user_model(id: i64, role: &str) -> user::Model {
    user::Model {
        id,
        email: format!("user{id}@example.com"),
        name: format!("User {id}"),
        role: role.to_string(),
        session_token: None,
    }
}

/// Creates a user with a session token from [`session_token`].
///
/// # Arguments
/// * `email` - Stored lower-cased
/// * `role` - `"client"` or `"admin"`
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    role: &str,
) -> Result<user::Model> {
    user::ActiveModel {
        email: Set(email.to_lowercase()),
        name: Set(email.split('@').next().unwrap_or(email).to_string()),
        role: Set(role.to_string()),
        session_token: Set(Some(session_token(email))),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Deliverable input with sensible defaults.
///
/// # Defaults
/// * `category`: "design"
/// * `fixed_hours` / `fixed_price`: 0.0
pub fn sample_deliverable(name: &str, points: f64) -> NewDeliverable {
    NewDeliverable {
        name: name.to_string(),
        description: format!("{name} description"),
        category: "design".to_string(),
        scope: String::new(),
        default_estimate_points: points,
        fixed_hours: 0.0,
        fixed_price: 0.0,
    }
}

/// Creates an active catalog deliverable.
pub async fn create_test_deliverable(
    db: &DatabaseConnection,
    name: &str,
    points: f64,
) -> Result<deliverable::Model> {
    catalog::create_deliverable(db, sample_deliverable(name, points)).await
}

/// Creates an active package named after its slug, with one fresh deliverable per
/// `(points, quantity, complexity_score)` item.
pub async fn setup_package(
    db: &DatabaseConnection,
    slug: &str,
    items: &[(f64, i32, Option<f64>)],
) -> Result<(sprint_package::Model, Vec<deliverable::Model>)> {
    let package = sprint_package::ActiveModel {
        slug: Set(slug.to_string()),
        name: Set(slug.to_string()),
        description: Set(String::new()),
        flat_fee: Set(None),
        flat_hours: Set(None),
        discount_percentage: Set(None),
        active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut deliverables = Vec::with_capacity(items.len());
    for (i, &(points, quantity, complexity_score)) in items.iter().enumerate() {
        let deliverable = create_test_deliverable(db, &format!("{slug}-{i}"), points).await?;
        sprint_package_deliverable::ActiveModel {
            sprint_package_id: Set(package.id),
            deliverable_id: Set(deliverable.id),
            quantity: Set(quantity),
            sort_order: Set(i32::try_from(i).unwrap_or(i32::MAX)),
            complexity_score: Set(complexity_score),
            ..Default::default()
        }
        .insert(db)
        .await?;
        deliverables.push(deliverable);
    }
    Ok((package, deliverables))
}

async fn load_package(db: &DatabaseConnection, id: i64) -> Result<sprint_package::ActiveModel> {
    entities::SprintPackage::find_by_id(id)
        .one(db)
        .await?
        .map(Into::into)
        .ok_or(Error::PackageNotFound {
            key: id.to_string(),
        })
}

/// Marks a package inactive.
pub async fn deactivate_package(db: &DatabaseConnection, id: i64) -> Result<()> {
    let mut package = load_package(db, id).await?;
    package.active = Set(false);
    package.update(db).await?;
    Ok(())
}

/// Sets a package's flat fee, flat hours and discount.
pub async fn set_package_terms(
    db: &DatabaseConnection,
    id: i64,
    flat_fee: Option<f64>,
    flat_hours: Option<f64>,
    discount_percentage: Option<f64>,
) -> Result<()> {
    let mut package = load_package(db, id).await?;
    package.flat_fee = Set(flat_fee);
    package.flat_hours = Set(flat_hours);
    package.discount_percentage = Set(discount_percentage);
    package.update(db).await?;
    Ok(())
}

/// Adds a viewer member directly, bypassing the membership flow.
pub async fn add_test_member(
    db: &DatabaseConnection,
    project_id: i64,
    email: &str,
    invited_by: i64,
) -> Result<project_member::Model> {
    project_member::ActiveModel {
        project_id: Set(project_id),
        email: Set(email.to_lowercase()),
        role: Set("viewer".to_string()),
        invited_by: Set(invited_by),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Mailer that records successful sends, or fails every send.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    fail: bool,
    fail_to: Vec<String>,
}

impl RecordingMailer {
    /// A mailer whose every send fails with `Error::Upstream`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// A mailer that fails only for these recipients.
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            fail_to: recipients.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// Emails sent so far.
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        if self.fail || self.fail_to.contains(&email.to) {
            return Err(Error::Upstream {
                message: "mail provider unavailable".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

/// Composer that returns a canned draft or a canned error, recording prompts.
#[derive(Debug, Default)]
pub struct StubComposer {
    reply: Option<SummaryDraft>,
    error: Mutex<Option<Error>>,
    prompts: Mutex<Vec<String>>,
}

impl StubComposer {
    /// A composer that always answers with this subject and body.
    pub fn replying(subject: &str, body: &str) -> Self {
        Self {
            reply: Some(SummaryDraft {
                subject: subject.to_string(),
                body: body.to_string(),
            }),
            ..Self::default()
        }
    }

    /// A composer that fails with `error` on its first call.
    pub fn failing(error: Error) -> Self {
        Self {
            error: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    /// The most recent user prompt.
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().ok().and_then(|p| p.last().cloned())
    }
}

#[async_trait]
impl SummaryComposer for StubComposer {
    async fn compose(&self, _system: &str, prompt: &str) -> Result<SummaryDraft> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(error) = self.error.lock().ok().and_then(|mut e| e.take()) {
            return Err(error);
        }
        self.reply.clone().ok_or(Error::Upstream {
            message: "no canned reply".to_string(),
        })
    }
}
