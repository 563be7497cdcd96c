use apksure_api::auth::password::hash_password;
use apksure_api::{setup_routes, AppState};
use apksure_core::config::{BaseConfig, ServerConfig};
use apksure_core::Config;
use apksure_db::{MemoryUserStore, UserStore};
use axum::http::{header::AUTHORIZATION, HeaderValue};
use axum_test::{TestRequest, TestServer};
use std::sync::Arc;
use wiremock::MockServer;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-at-least-32-characters";

/// Test application backed by the in-memory user store and a mock analysis backend
pub struct TestApp {
    pub server: TestServer,
    pub users: MemoryUserStore,
    pub analysis: MockServer,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub async fn seed_user(&self, email: &str, password: &str) {
        let hash = hash_password(password).expect("hash password");
        self.users
            .create_user(email, hash)
            .await
            .expect("seed user");
    }

    /// Sign in and return the session token
    pub async fn sign_in(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .post("/api/signin")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .await;
        assert_eq!(response.status_code(), 200, "sign-in failed: {}", response.text());

        let body: serde_json::Value = response.json();
        body["token"].as_str().expect("token").to_string()
    }
}

pub fn test_config(analysis_api_url: &str) -> ServerConfig {
    ServerConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 5,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_expiry_hours: 1,
            environment: "test".to_string(),
        },
        database_url: "postgresql://localhost:5432/apk_analyzer_test".to_string(),
        analysis_api_url: analysis_api_url.to_string(),
        analysis_timeout_seconds: 5,
        max_apk_size_bytes: 50 * 1024 * 1024,
        allowed_extensions: vec!["apk".to_string()],
        signin_max_failures: 5,
        signin_failure_window_secs: 300,
    }
}

/// Setup a test application with default limits
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup a test application, adjusting the configuration first
pub async fn setup_test_app_with(configure: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let analysis = MockServer::start().await;
    let mut server_config = test_config(&analysis.uri());
    configure(&mut server_config);
    let config = Config(Box::new(server_config));

    let users = MemoryUserStore::new();
    let server = build_server(&config, Arc::new(users.clone()));

    TestApp {
        server,
        users,
        analysis,
    }
}

/// Build a test server around any user store
pub fn build_server(config: &Config, users: Arc<dyn UserStore>) -> TestServer {
    let state = AppState::from_config(config, users).expect("app state");
    let router = setup_routes(config, Arc::new(state)).expect("router");
    TestServer::new(router).expect("test server")
}

/// Attach `Authorization: Bearer <token>`
pub fn with_session(request: TestRequest, token: &str) -> TestRequest {
    let value = HeaderValue::from_str(&format!("Bearer {}", token)).expect("header value");
    request.add_header(AUTHORIZATION, value)
}
