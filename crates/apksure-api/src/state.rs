//! Application state shared by every handler.

use crate::auth::{JwtService, SignInLimiter};
use apksure_core::{ArtifactValidator, Config};
use apksure_db::UserStore;
use apksure_services::AnalysisClient;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub jwt: JwtService,
    pub analysis: AnalysisClient,
    pub validator: ArtifactValidator,
    pub signin_limiter: SignInLimiter,
}

impl AppState {
    /// Build state from configuration around an already-connected user store.
    pub fn from_config(config: &Config, users: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let analysis = AnalysisClient::new(
            config.analysis_api_url(),
            Duration::from_secs(config.analysis_timeout_seconds()),
        )?;

        Ok(Self {
            users,
            jwt: JwtService::new(config.jwt_secret(), config.jwt_expiry_hours()),
            analysis,
            validator: ArtifactValidator::new(
                config.max_apk_size_bytes(),
                config.allowed_extensions().to_vec(),
            ),
            signin_limiter: SignInLimiter::new(
                config.signin_max_failures(),
                config.signin_failure_window_secs(),
            ),
        })
    }
}
