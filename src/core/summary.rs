//! Daily sprint summary: gathers the day's context, asks the composer for an email,
//! and either returns it as a preview or sends it to the sprint's audience.

use crate::{
    core::{member, project, sprint},
    entities::{
        ProjectMember, User, project_member, sprint_daily_update, sprint_deliverable,
        sprint_draft,
    },
    errors::{Error, Result},
    services::{
        links::{LinkContent, LinkFetcher},
        mailer::{Email, Mailer},
        openai::{SummaryComposer, SummaryDraft},
    },
};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// System prompt given to the composer.
pub const SYSTEM_PROMPT: &str = "You write short daily status emails for Meisner Design, \
a product design studio, to its clients. Be warm, concrete and brief. Mention only \
work that appears in the provided updates. Reply with a JSON object with exactly two \
string fields: \"subject\" and \"body\" (plain text, no markdown).";

/// Whether to only draft the summary or also email it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    Preview,
    Send,
}

/// Daily summary request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub mode: SummaryMode,
    /// Day to summarise (UTC); today when absent
    pub date: Option<NaiveDate>,
    /// Explicit recipients for `send`; project owner plus members when absent
    pub recipients: Option<Vec<String>>,
    /// Supplemental files to include in the prompt
    pub link_urls: Option<Vec<String>>,
}

/// Everything the prompt is built from.
#[derive(Debug, Clone)]
pub struct SummaryContext {
    pub date: NaiveDate,
    pub draft: sprint_draft::Model,
    pub deliverables: Vec<sprint_deliverable::Model>,
    pub updates: Vec<sprint_daily_update::Model>,
    pub links: Vec<LinkContent>,
}

/// Drafted summary, plus who it was sent to in `send` mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    pub mode: SummaryMode,
    pub subject: String,
    pub body: String,
    pub update_count: usize,
    /// Recipients the mailer accepted
    pub recipients: Vec<String>,
    /// Recipients whose send failed while others succeeded
    pub failed: Vec<String>,
}

/// Renders the user prompt for the composer.
#[must_use]
pub fn build_prompt(context: &SummaryContext) -> String {
    let draft = &context.draft;
    let mut prompt = format!(
        "Sprint: {} (status: {})\nDate: {}\n",
        draft.title, draft.status, context.date
    );
    if let Some(due) = draft.due_date {
        prompt.push_str(&format!("Due: {due}\n"));
    }

    prompt.push_str("\nDeliverables:\n");
    for d in &context.deliverables {
        prompt.push_str(&format!("- {} x{} ({})\n", d.name, d.quantity, d.category));
    }

    prompt.push_str("\nUpdates today:\n");
    if context.updates.is_empty() {
        prompt.push_str("- No updates were logged today.\n");
    }
    for update in &context.updates {
        prompt.push_str(&format!(
            "- [{}] {}\n",
            update.created_at.format("%H:%M"),
            update.body
        ));
    }

    for link in &context.links {
        prompt.push_str(&format!(
            "\nSupplemental notes from {}:\n{}\n",
            link.url, link.text
        ));
    }
    prompt
}

/// Default audience: the project owner followed by its members, deduplicated.
async fn default_recipients<C>(db: &C, project_id: i64) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    let project = project::get_project(db, project_id)
        .await?
        .ok_or(Error::ProjectNotFound { id: project_id })?;
    let mut recipients = Vec::new();
    if let Some(owner) = User::find_by_id(project.owner_id).one(db).await? {
        recipients.push(owner.email.to_lowercase());
    }
    let members = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .all(db)
        .await?;
    for m in members {
        if !recipients.contains(&m.email) {
            recipients.push(m.email);
        }
    }
    Ok(recipients)
}

fn explicit_recipients(raw: &[String]) -> Result<Vec<String>> {
    let mut recipients = Vec::with_capacity(raw.len());
    for r in raw {
        let email = member::normalize_email(r)?;
        if !recipients.contains(&email) {
            recipients.push(email);
        }
    }
    Ok(recipients)
}

/// Loads the draft, its deliverables, the day's updates and any supplemental links.
pub async fn gather_context(
    db: &DatabaseConnection,
    links: &LinkFetcher,
    draft_id: i64,
    date: NaiveDate,
    link_urls: &[String],
) -> Result<SummaryContext> {
    let draft = sprint::find_sprint_draft(db, draft_id)
        .await?
        .ok_or(Error::SprintDraftNotFound { id: draft_id })?;
    let deliverables = sprint_deliverable::Entity::find()
        .filter(sprint_deliverable::Column::SprintDraftId.eq(draft_id))
        .all(db)
        .await?;
    let updates = sprint::get_daily_updates_for_date(db, draft_id, date).await?;
    let links = links.fetch_all(link_urls).await;

    Ok(SummaryContext {
        date,
        draft,
        deliverables,
        updates,
        links,
    })
}

/// Drafts the daily summary and, in `send` mode, emails it.
///
/// # Errors
/// - `Error::SprintDraftNotFound` for an unknown draft
/// - `Error::Validation` for an invalid explicit recipient, or `send` with nobody to send to
/// - `Error::UpstreamTimeout` / `Error::Upstream` from the composer, or from the mailer
///   when no recipient could be reached. Partial delivery succeeds and lists the
///   failed recipients in [`SummaryOutcome::failed`].
/// - `Error::Config` when the composer has no API key
#[instrument(skip(db, composer, links, mailer, request), fields(mode = ?request.mode))]
pub async fn daily_summary(
    db: &DatabaseConnection,
    composer: &dyn SummaryComposer,
    links: &LinkFetcher,
    mailer: &dyn Mailer,
    draft_id: i64,
    request: SummaryRequest,
) -> Result<SummaryOutcome> {
    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let recipients = match (&request.mode, &request.recipients) {
        (SummaryMode::Send, Some(raw)) if !raw.is_empty() => explicit_recipients(raw)?,
        _ => Vec::new(),
    };

    let context = gather_context(
        db,
        links,
        draft_id,
        date,
        request.link_urls.as_deref().unwrap_or_default(),
    )
    .await?;
    let SummaryDraft { subject, body } = composer
        .compose(SYSTEM_PROMPT, &build_prompt(&context))
        .await?;

    let mut outcome = SummaryOutcome {
        mode: request.mode,
        subject,
        body,
        update_count: context.updates.len(),
        recipients: Vec::new(),
        failed: Vec::new(),
    };
    if request.mode == SummaryMode::Preview {
        return Ok(outcome);
    }

    let recipients = if recipients.is_empty() {
        default_recipients(db, context.draft.project_id).await?
    } else {
        recipients
    };
    if recipients.is_empty() {
        return Err(Error::validation("No recipients for this sprint"));
    }

    let mut last_error = None;
    for to in recipients {
        let email = Email {
            to: to.clone(),
            subject: outcome.subject.clone(),
            body: outcome.body.clone(),
        };
        match mailer.send(&email).await {
            Ok(()) => outcome.recipients.push(to),
            Err(e) => {
                warn!(draft_id, to = %to, "Failed to send daily summary: {}", e);
                outcome.failed.push(to);
                last_error = Some(e);
            }
        }
    }

    // Nobody got it: report the mailer's failure.
    if let Some(e) = last_error.filter(|_| outcome.recipients.is_empty()) {
        return Err(e);
    }
    info!(
        draft_id,
        sent = outcome.recipients.len(),
        failed = outcome.failed.len(),
        "Sent daily summary"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::pricing::PricingPolicy;
    use crate::core::sprint::{DeliverableSelection, NewSprintDraft};
    use crate::test_utils::*;

    async fn sprint_with_update(db: &DatabaseConnection) -> Result<(i64, crate::entities::user::Model)> {
        let owner = create_test_user(db, "owner@example.com", "client").await?;
        let admin = create_test_user(db, "admin@example.com", "admin").await?;
        let landing = create_test_deliverable(db, "Landing", 3.0).await?;
        let created = sprint::create_sprint_draft(
            db,
            &PricingPolicy::default(),
            &owner,
            NewSprintDraft {
                title: "Acme launch".to_string(),
                deliverables: Some(vec![DeliverableSelection {
                    deliverable_id: landing.id,
                    quantity: None,
                    complexity_score: None,
                }]),
                ..NewSprintDraft::default()
            },
        )
        .await?;
        add_test_member(db, created.draft.project_id, "ana@example.com", owner.id).await?;
        sprint::add_daily_update(db, &admin, created.draft.id, "Hero section approved").await?;
        Ok((created.draft.id, admin))
    }

    fn request(mode: SummaryMode) -> SummaryRequest {
        SummaryRequest {
            mode,
            date: None,
            recipients: None,
            link_urls: None,
        }
    }

    #[tokio::test]
    async fn test_preview_does_not_send() -> Result<()> {
        let db = setup_test_db().await?;
        let (draft_id, _) = sprint_with_update(&db).await?;
        let composer = StubComposer::replying("Day 1", "Hero approved.");
        let mailer = RecordingMailer::default();
        let links = crate::services::links::LinkFetcher::new()?;

        let outcome = daily_summary(&db, &composer, &links, &mailer, draft_id, request(SummaryMode::Preview)).await?;
        assert_eq!(outcome.subject, "Day 1");
        assert_eq!(outcome.update_count, 1);
        assert!(mailer.sent().is_empty());

        let prompt = composer.last_prompt().unwrap();
        assert!(prompt.contains("Hero section approved"));
        assert!(prompt.contains("Landing x1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_send_defaults_to_owner_and_members() -> Result<()> {
        let db = setup_test_db().await?;
        let (draft_id, _) = sprint_with_update(&db).await?;
        let composer = StubComposer::replying("Day 1", "Hero approved.");
        let mailer = RecordingMailer::default();
        let links = crate::services::links::LinkFetcher::new()?;

        let outcome = daily_summary(&db, &composer, &links, &mailer, draft_id, request(SummaryMode::Send)).await?;
        assert_eq!(outcome.recipients, vec!["owner@example.com", "ana@example.com"]);
        assert_eq!(mailer.sent().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_composer_and_mailer_failures_propagate() -> Result<()> {
        let db = setup_test_db().await?;
        let (draft_id, _) = sprint_with_update(&db).await?;
        let links = crate::services::links::LinkFetcher::new()?;

        let timeout = daily_summary(
            &db,
            &StubComposer::failing(Error::UpstreamTimeout),
            &links,
            &RecordingMailer::default(),
            draft_id,
            request(SummaryMode::Preview),
        )
        .await;
        assert!(matches!(timeout.unwrap_err(), Error::UpstreamTimeout));

        let send = daily_summary(
            &db,
            &StubComposer::replying("s", "b"),
            &links,
            &RecordingMailer::failing(),
            draft_id,
            request(SummaryMode::Send),
        )
        .await;
        assert!(matches!(send.unwrap_err(), Error::Upstream { .. }));

        let missing = daily_summary(
            &db,
            &StubComposer::replying("s", "b"),
            &links,
            &RecordingMailer::default(),
            4242,
            request(SummaryMode::Preview),
        )
        .await;
        assert!(matches!(missing.unwrap_err(), Error::SprintDraftNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_send_reports_failed_recipients() -> Result<()> {
        let db = setup_test_db().await?;
        let (draft_id, _) = sprint_with_update(&db).await?;
        let mailer = RecordingMailer::failing_for(&["owner@example.com"]);
        let links = crate::services::links::LinkFetcher::new()?;

        let outcome = daily_summary(
            &db,
            &StubComposer::replying("s", "b"),
            &links,
            &mailer,
            draft_id,
            request(SummaryMode::Send),
        )
        .await?;
        assert_eq!(outcome.recipients, vec!["ana@example.com"]);
        assert_eq!(outcome.failed, vec!["owner@example.com"]);
        assert_eq!(mailer.sent().len(), 1);
        Ok(())
    }

    #[test]
    fn test_explicit_recipients_are_normalized() {
        let recipients =
            explicit_recipients(&["A@x.io".to_string(), "a@x.io".to_string()]).unwrap();
        assert_eq!(recipients, vec!["a@x.io"]);
        assert!(explicit_recipients(&["nope".to_string()]).is_err());
    }
}
