//! HS256 session tokens

use crate::auth::models::JwtClaims;
use apksure_core::{AppError, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl JwtService {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours),
        }
    }

    /// Issue a token for `user`; returns the token and its expiry.
    pub fn issue(&self, user: &User) -> Result<(String, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let expires_at = now + self.expiry;
        let claims = JwtClaims {
            sub: user.id,
            email: user.email.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to issue session token: {}", e)))?;

        Ok((token, expires_at))
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthorized("Session has expired".to_string())
                }
                _ => AppError::Unauthorized("Invalid session token".to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_validate() {
        let service = JwtService::new(&"s".repeat(32), 24);
        let user = user();
        let (token, expires_at) = service.issue(&user).expect("issue");

        let claims = service.validate(&token).expect("validate");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp, expires_at.timestamp());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuer = JwtService::new(&"a".repeat(32), 24);
        let verifier = JwtService::new(&"b".repeat(32), 24);
        let (token, _) = issuer.issue(&user()).expect("issue");

        assert!(matches!(
            verifier.validate(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new(&"s".repeat(32), -1);
        let (token, _) = service.issue(&user()).expect("issue");

        match service.validate(&token) {
            Err(AppError::Unauthorized(msg)) => assert_eq!(msg, "Session has expired"),
            other => panic!("expected expired session, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = JwtService::new(&"s".repeat(32), 24);
        assert!(service.validate("not.a.jwt").is_err());
    }
}
