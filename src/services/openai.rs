//! AI client used to draft the daily sprint summary.

use crate::config::env::EnvSettings;
use crate::errors::{Error, Result};
use crate::services::mailer::map_reqwest_error;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Subject and body drafted by the composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDraft {
    pub subject: String,
    pub body: String,
}

/// Drafts a summary email from a system prompt and a user prompt.
#[async_trait]
pub trait SummaryComposer: Send + Sync {
    /// # Errors
    /// - `Error::Config` when the composer has no credentials
    /// - `Error::UpstreamTimeout` when the provider does not answer in time
    /// - `Error::Upstream` for a non-OK response or unparseable output
    async fn compose(&self, system: &str, prompt: &str) -> Result<SummaryDraft>;
}

/// Stand-in used when `OPENAI_API_KEY` is not set.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredComposer;

#[async_trait]
impl SummaryComposer for UnconfiguredComposer {
    async fn compose(&self, _system: &str, _prompt: &str) -> Result<SummaryDraft> {
        Err(Error::Config {
            message: "OPENAI_API_KEY is not set".to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiComposer {
    http: Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiComposer {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a client for the public OpenAI endpoint.
    ///
    /// # Errors
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_url(api_key, model, OPENAI_API_URL.to_string())
    }

    /// Creates a client for an OpenAI-compatible endpoint.
    pub fn with_url(api_key: String, model: String, url: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("meisner-studio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build OpenAI client: {e}"),
            })?;
        Ok(Self {
            http,
            api_key,
            model,
            url,
        })
    }
}

#[async_trait]
impl SummaryComposer for OpenAiComposer {
    async fn compose(&self, system: &str, prompt: &str) -> Result<SummaryDraft> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.4,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let res = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                return Err(Error::Upstream {
                    message: "OpenAI rejected the API key".to_string(),
                });
            }
            s => {
                let body = res.text().await.unwrap_or_default();
                return Err(Error::Upstream {
                    message: format!("OpenAI returned {s}: {body}"),
                });
            }
        }

        let response: ChatResponse = res.json().await.map_err(map_reqwest_error)?;
        let content = response
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .unwrap_or_default();
        debug!(chars = content.len(), "OpenAI summary received");
        parse_summary(&content)
    }
}

/// Parses `{subject, body}` out of model output, tolerating markdown code fences.
pub fn parse_summary(content: &str) -> Result<SummaryDraft> {
    let json = extract_json(content);
    let draft: SummaryDraft = serde_json::from_str(json).map_err(|e| {
        error!(response = %content, "Failed to parse summary JSON");
        Error::Upstream {
            message: format!("Invalid summary JSON: {e}"),
        }
    })?;
    if draft.subject.trim().is_empty() || draft.body.trim().is_empty() {
        return Err(Error::Upstream {
            message: "Summary is missing a subject or body".to_string(),
        });
    }
    Ok(draft)
}

fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Picks the composer for the environment.
///
/// # Errors
/// Returns `Error::Config` if the OpenAI client cannot be built.
pub fn composer_from_env(env: &EnvSettings) -> Result<Arc<dyn SummaryComposer>> {
    match &env.openai_api_key {
        Some(key) => Ok(Arc::new(OpenAiComposer::new(
            key.clone(),
            env.openai_model.clone(),
        )?)),
        None => Ok(Arc::new(UnconfiguredComposer)),
    }
}
