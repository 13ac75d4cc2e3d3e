//! Fetches supplemental link files (notes, changelogs) for the daily summary.
//!
//! Each URL gets its own 8 second budget. Failures are skipped with a warning so
//! one dead link never blocks the summary.

use crate::errors::{Error, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Longest excerpt kept from a single link, in characters.
const MAX_EXCERPT_CHARS: usize = 4_000;

/// Text fetched from one supplemental link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkContent {
    pub url: String,
    pub text: String,
}

/// HTTP fetcher for supplemental links.
#[derive(Debug, Clone)]
pub struct LinkFetcher {
    http: Client,
}

impl LinkFetcher {
    const PER_LINK_TIMEOUT: Duration = Duration::from_secs(8);

    /// # Errors
    /// Returns `Error::Config` if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Self::PER_LINK_TIMEOUT)
            .user_agent(concat!("meisner-studio/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build link client: {e}"),
            })?;
        Ok(Self { http })
    }

    async fn fetch_one(&self, url: &str) -> Result<String> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(crate::services::mailer::map_reqwest_error)?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                message: format!("{url} returned {status}"),
            });
        }
        res.text()
            .await
            .map_err(crate::services::mailer::map_reqwest_error)
    }

    /// Fetches every http(s) URL in order, skipping the ones that fail.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<LinkContent> {
        let mut fetched = Vec::new();
        for url in urls {
            let url = url.trim();
            if !is_http_url(url) {
                warn!(url, "Skipping supplemental link with unsupported scheme");
                continue;
            }
            match self.fetch_one(url).await {
                Ok(text) => fetched.push(LinkContent {
                    url: url.to_string(),
                    text: truncate_chars(text.trim(), MAX_EXCERPT_CHARS),
                }),
                Err(e) => warn!(url, error = %e, "Skipping supplemental link"),
            }
        }
        fetched
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé…");
    }

    #[tokio::test]
    async fn test_unsupported_schemes_are_skipped() {
        let fetcher = LinkFetcher::new().unwrap();
        let fetched = fetcher
            .fetch_all(&["file:///etc/passwd".to_string(), "  ".to_string()])
            .await;
        assert!(fetched.is_empty());
    }
}
