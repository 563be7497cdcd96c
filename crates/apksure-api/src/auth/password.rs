//! Salted password hashing (Argon2id, PHC string format).

use apksure_core::AppError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use std::sync::OnceLock;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; a stored hash that cannot be parsed is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Run a full verification against a throwaway hash.
///
/// Sign-in calls this for unknown emails so that the response time does not
/// reveal whether an account exists. Always returns `false`.
pub fn verify_against_dummy(password: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("apksure-dummy-password").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("x").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("x", &hash).expect("verify"));
        assert!(!verify_password("y", &hash).expect("verify"));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        let a = hash_password("secret").expect("hash");
        let b = hash_password("secret").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("x", "x").is_err());
    }

    #[test]
    fn test_dummy_verification_never_succeeds() {
        assert!(!verify_against_dummy("apksure-dummy-password"));
        assert!(!verify_against_dummy(""));
    }
}
