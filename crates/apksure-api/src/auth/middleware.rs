use crate::auth::models::SessionContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use apksure_core::AppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Require `Authorization: Bearer <session token>` and attach a `SessionContext`.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            tracing::debug!(path = %request.uri().path(), "Missing authorization header");
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => token.trim(),
        _ => {
            return HttpAppError(AppError::Unauthorized(
                "Invalid authorization header format".to_string(),
            ))
            .into_response();
        }
    };

    let claims = match state.jwt.validate(token) {
        Ok(claims) => claims,
        Err(err) => return HttpAppError(err).into_response(),
    };

    let session = SessionContext::from(claims);
    tracing::debug!(user_id = %session.user_id, "Session authenticated");
    request.extensions_mut().insert(session);

    next.run(request).await
}
