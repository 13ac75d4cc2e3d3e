/// Database configuration and connection management
pub mod database;

/// Environment-variable settings (secrets, URLs, bind address)
pub mod env;

/// Pricing policy and catalog seed loading from config.toml
pub mod settings;
