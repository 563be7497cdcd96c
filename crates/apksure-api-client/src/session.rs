use apksure_core::models::SignInResponse;
use chrono::{DateTime, Utc};

/// Proof of a successful sign-in. Required for every analysis request.
#[derive(Clone)]
pub struct Session {
    token: String,
    email: String,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(token: String, email: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            email,
            expires_at,
        }
    }

    pub(crate) fn from_response(email: &str, response: SignInResponse) -> Self {
        Self::new(response.token, email.to_string(), response.expires_at)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
