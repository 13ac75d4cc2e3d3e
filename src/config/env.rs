//! Environment-variable settings.
//!
//! Secrets and deployment-specific URLs come from the environment (optionally via
//! `.env`), never from `config.toml`. Everything except the database URL has a
//! sensible default or is optional.

use super::database::get_database_url;

/// Settings read from the process environment.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    /// `DATABASE_URL`
    pub database_url: String,
    /// `BIND_ADDRESS`, default `0.0.0.0:3000`
    pub bind_address: String,
    /// `CONFIG_PATH`, default `config.toml`
    pub config_path: String,
    /// `OPENAI_API_KEY`; the daily summary fails with a configuration error without it
    pub openai_api_key: Option<String>,
    /// `OPENAI_MODEL`, default `gpt-4o-mini`
    pub openai_model: String,
    /// `EMAIL_WEBHOOK_URL`; emails are only logged when unset
    pub email_webhook_url: Option<String>,
    /// `EMAIL_FROM`
    pub email_from: String,
    /// `APP_BASE_URL`, used for links inside emails
    pub app_base_url: String,
}

impl EnvSettings {
    /// Reads all settings from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            database_url: get_database_url(),
            bind_address: var_or("BIND_ADDRESS", "0.0.0.0:3000"),
            config_path: var_or("CONFIG_PATH", "config.toml"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_model: var_or("OPENAI_MODEL", "gpt-4o-mini"),
            email_webhook_url: non_empty_var("EMAIL_WEBHOOK_URL"),
            email_from: var_or("EMAIL_FROM", "Meisner Design <studio@meisner.design>"),
            app_base_url: var_or("APP_BASE_URL", "http://localhost:3000"),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    non_empty_var(key).unwrap_or_else(|| default.to_string())
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_variable_falls_back_to_default() {
        assert_eq!(
            var_or("MEISNER_TEST_SURELY_UNSET_VARIABLE", "fallback"),
            "fallback"
        );
        assert!(non_empty_var("MEISNER_TEST_SURELY_UNSET_VARIABLE").is_none());
    }
}
