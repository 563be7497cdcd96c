//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use apksure_core::Config;
use apksure_db::UserRepository;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_tracing();
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let users = Arc::new(UserRepository::new(pool));

    let state = Arc::new(AppState::from_config(&config, users)?);
    tracing::info!(
        analysis_api_url = %state.analysis.base_url(),
        "Analysis client ready"
    );

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
