//! Domain models shared by the server and the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// The only job status after which polling stops.
pub const STATUS_COMPLETE: &str = "complete";

/// Trim and lowercase an email so lookups and writes agree on one form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Stored user record
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignInRequest {
    #[schema(example = "a@b.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignInResponse {
    #[schema(example = "Sign-in successful!")]
    pub message: String,
    /// Bearer token for the analysis routes
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Email must be a valid address"))]
    #[schema(example = "a@b.com")]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub id: Uuid,
    pub email: String,
}

/// Returned by the analysis backend once an artifact is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobSubmission {
    #[schema(example = "6f1c2a")]
    pub jobid: String,
}

/// Identity of an analysed application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppInfo {
    pub name: String,
    pub package: String,
    pub version_name: String,
    pub version_code: i64,
    pub apk_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    #[serde(default)]
    pub app: Option<AppInfo>,
}

/// One poll of `GET <result-endpoint>/<jobid>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobStatusResponse {
    #[schema(example = "pending")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
}

impl JobStatusResponse {
    pub fn pending(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            result: None,
        }
    }

    pub fn complete(app: AppInfo) -> Self {
        Self {
            status: STATUS_COMPLETE.to_string(),
            result: Some(AnalysisResult { app: Some(app) }),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == STATUS_COMPLETE
    }

    pub fn app(&self) -> Option<&AppInfo> {
        self.result.as_ref().and_then(|r| r.app.as_ref())
    }
}
