//! Configuration module
//!
//! Server configuration loaded from the environment (with `.env` support),
//! including the user store, session tokens and the external analysis backend.

use std::env;

// Common constants
const SERVER_PORT: u16 = 5000;
const DATABASE_URL: &str = "postgresql://localhost:5432/apk_analyzer";
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const ANALYSIS_API_URL: &str = "https://fakeapk.onrender.com";
const ANALYSIS_TIMEOUT_SECS: u64 = 120;
const MAX_APK_SIZE_MB: usize = 50;
const SIGNIN_MAX_FAILURES: u32 = 5;
const SIGNIN_FAILURE_WINDOW_SECS: u64 = 300;

/// Settings every deployment needs regardless of backend wiring
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: String,
}

/// Full server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // External analysis backend
    pub analysis_api_url: String,
    pub analysis_timeout_seconds: u64,
    // Artifact limits
    pub max_apk_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    // Sign-in throttling
    pub signin_max_failures: u32,
    pub signin_failure_window_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServerConfig>);

impl Config {
    fn inner(&self) -> &ServerConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServerConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().base.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.inner().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.inner().base.jwt_expiry_hours
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn analysis_api_url(&self) -> &str {
        &self.inner().analysis_api_url
    }

    pub fn analysis_timeout_seconds(&self) -> u64 {
        self.inner().analysis_timeout_seconds
    }

    pub fn max_apk_size_bytes(&self) -> usize {
        self.inner().max_apk_size_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.inner().allowed_extensions
    }

    pub fn signin_max_failures(&self) -> u32 {
        self.inner().signin_max_failures
    }

    pub fn signin_failure_window_secs(&self) -> u64 {
        self.inner().signin_failure_window_secs
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| JWT_EXPIRY_HOURS.to_string())
                .parse()
                .unwrap_or(JWT_EXPIRY_HOURS),
            environment,
        };

        let max_apk_size_mb = env::var("MAX_APK_SIZE_MB")
            .unwrap_or_else(|_| MAX_APK_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_APK_SIZE_MB);
        let max_apk_size_bytes = megabytes_to_bytes(max_apk_size_mb)?;

        let config = ServerConfig {
            base,
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| DATABASE_URL.to_string()),
            analysis_api_url: env::var("ANALYSIS_API_URL")
                .unwrap_or_else(|_| ANALYSIS_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            analysis_timeout_seconds: env::var("ANALYSIS_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| ANALYSIS_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(ANALYSIS_TIMEOUT_SECS),
            max_apk_size_bytes,
            allowed_extensions: env::var("ALLOWED_EXTENSIONS")
                .unwrap_or_else(|_| "apk".to_string())
                .split(',')
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            signin_max_failures: env::var("SIGNIN_MAX_FAILURES")
                .unwrap_or_else(|_| SIGNIN_MAX_FAILURES.to_string())
                .parse()
                .unwrap_or(SIGNIN_MAX_FAILURES),
            signin_failure_window_secs: env::var("SIGNIN_FAILURE_WINDOW_SECS")
                .unwrap_or_else(|_| SIGNIN_FAILURE_WINDOW_SECS.to_string())
                .parse()
                .unwrap_or(SIGNIN_FAILURE_WINDOW_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.base.db_max_connections == 0 {
            return Err(anyhow::anyhow!("Database max connections cannot be 0"));
        }

        if self.base.db_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Database timeout cannot be 0"));
        }

        if self.base.jwt_expiry_hours <= 0 {
            return Err(anyhow::anyhow!("JWT_EXPIRY_HOURS must be positive"));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_EXTENSIONS must list at least one extension"
            ));
        }

        if self.max_apk_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_APK_SIZE_MB cannot be 0"));
        }

        if !self.analysis_api_url.starts_with("http://")
            && !self.analysis_api_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!("ANALYSIS_API_URL must be an http(s) URL"));
        }

        if is_production_name(&self.base.environment)
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        Ok(())
    }
}

fn megabytes_to_bytes(megabytes: usize) -> Result<usize, anyhow::Error> {
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_APK_SIZE_MB is too large: {}", megabytes))
}
