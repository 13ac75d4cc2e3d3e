//! Outbound email.
//!
//! Core flows build an [`Email`] from one of the templates below and hand it to a
//! [`Mailer`]. Production uses [`WebhookMailer`] (a JSON POST to a transactional
//! email provider); without `EMAIL_WEBHOOK_URL` the [`LogMailer`] just logs.

use crate::config::env::EnvSettings;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers emails.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one email.
    ///
    /// # Errors
    /// Returns `Error::Upstream` (or `Error::UpstreamTimeout`) when delivery fails.
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Mailer that only writes a log line; used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "Email delivery disabled; logging only");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mailer that POSTs each email as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookMailer {
    http: Client,
    url: String,
    from: String,
}

impl WebhookMailer {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

    /// Builds a webhook mailer.
    ///
    /// # Errors
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(url: String, from: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("meisner-studio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build email client: {e}"),
            })?;
        Ok(Self { http, url, from })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        let payload = WebhookPayload {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.body,
        };
        let res = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                message: format!("email webhook returned {status}: {body}"),
            });
        }
        debug!(to = %email.to, "Email delivered");
        Ok(())
    }
}

/// Maps a transport failure to the crate's upstream errors.
pub(crate) fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::UpstreamTimeout
    } else {
        Error::Upstream {
            message: e.to_string(),
        }
    }
}

/// Picks the mailer for the environment: webhook when configured, log-only otherwise.
///
/// # Errors
/// Returns `Error::Config` if the webhook client cannot be built.
pub fn mailer_from_env(env: &EnvSettings) -> Result<Arc<dyn Mailer>> {
    match &env.email_webhook_url {
        Some(url) => Ok(Arc::new(WebhookMailer::new(
            url.clone(),
            env.email_from.clone(),
        )?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

/// Confirmation sent to the buyer after a package purchase.
#[must_use]
pub fn purchase_confirmation(
    to: &str,
    package_name: &str,
    sprint_title: &str,
    sprint_draft_id: i64,
    total_price: f64,
    app_base_url: &str,
) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Your {package_name} sprint is booked"),
        body: format!(
            "Thanks for purchasing {package_name}.\n\n\
             Sprint: {sprint_title}\n\
             Total: ${total_price:.2}\n\n\
             Review the sprint plan: {}/sprints/{sprint_draft_id}\n",
            app_base_url.trim_end_matches('/')
        ),
    }
}

/// Welcome sent to a newly added project member.
#[must_use]
pub fn member_welcome(to: &str, project_name: &str, role: &str, app_base_url: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("You've been added to {project_name}"),
        body: format!(
            "You now have {role} access to {project_name} on Meisner Design.\n\n\
             Sign in at {}/dashboard to follow along.\n",
            app_base_url.trim_end_matches('/')
        ),
    }
}

/// Notice sent to a member removed from a project.
#[must_use]
pub fn member_removed(to: &str, project_name: &str) -> Email {
    Email {
        to: to.to_string(),
        subject: format!("Your access to {project_name} has ended"),
        body: format!(
            "You no longer have access to {project_name}. \
             Reply to this email if you think this is a mistake.\n"
        ),
    }
}
