use crate::error::HttpAppError;
use apksure_core::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: Uuid, // user_id
    pub email: String,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

/// Session context extracted from the bearer token and stored in request extensions
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl From<JwtClaims> for SessionContext {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
        }
    }
}

// A missing session renders as a JSON 401 rather than `Extension`'s plain-text 500.
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized("Missing session".to_string()))
            })
    }
}
