#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use meisner_studio::{
    api::{self, AppState},
    config::{database, env::EnvSettings, settings},
    core::catalog,
    errors::{Error, Result},
    services::{links::LinkFetcher, mailer, openai},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    let env = EnvSettings::from_env();

    // 3. Pricing policy and catalog seed
    let settings = settings::load_settings_or_default(&env.config_path)
        .inspect_err(|e| error!("Failed to load {}: {}", env.config_path, e))?;
    info!(
        policy_version = %settings.pricing.version,
        deliverables = settings.deliverables.len(),
        packages = settings.packages.len(),
        "Loaded configuration"
    );

    // 4. Database, schema and seed data
    database::ensure_sqlite_dir(&env.database_url)?;
    let db = database::create_connection(&env.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready"))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;
    catalog::seed_catalog(&db, &settings)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 5. Outbound clients
    let state = AppState {
        db,
        policy: Arc::new(settings.pricing),
        mailer: mailer::mailer_from_env(&env)?,
        composer: openai::composer_from_env(&env)?,
        links: LinkFetcher::new()?,
        app_base_url: Arc::from(env.app_base_url.as_str()),
    };

    // 6. Serve
    let listener = TcpListener::bind(&env.bind_address).await?;
    info!("Listening on {}", env.bind_address);
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::from)?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
