//! Sign-in and registration handlers

use crate::auth::password::{hash_password, verify_against_dummy, verify_password};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use apksure_core::models::{RegisterRequest, RegisterResponse, SignInRequest, SignInResponse};
use apksure_core::{normalize_email, AppError};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/signin",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many failed attempts", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "signin"))]
pub async fn signin(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let email = normalize_email(&request.email);

    if state.signin_limiter.is_blocked(&email).await {
        return Err(AppError::TooManyRequests(
            "Too many failed sign-in attempts".to_string(),
        )
        .into());
    }

    let user = state.users.find_by_email(&email).await?;

    let verified = match &user {
        Some(user) => verify_password(&request.password, &user.password_hash)?,
        None => verify_against_dummy(&request.password),
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            let blocked = state.signin_limiter.record_failure(&email).await;
            tracing::info!(blocked, "Sign-in rejected");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
        }
    };

    state.signin_limiter.clear(&email).await;
    let (token, expires_at) = state.jwt.issue(&user)?;

    tracing::info!(user_id = %user.id, "Sign-in successful");
    Ok(Json(SignInResponse {
        message: "Sign-in successful!".to_string(),
        token,
        expires_at,
    }))
}

/// Create an account
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "register"))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = RegisterRequest {
        email: normalize_email(&request.email),
        password: request.password,
    };
    request.validate()?;

    let password_hash = hash_password(&request.password)?;
    let user = state
        .users
        .create_user(&request.email, password_hash)
        .await?;

    tracing::info!(user_id = %user.id, "Account created");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Account created".to_string(),
            id: user.id,
            email: user.email,
        }),
    ))
}
