//! Health check handler

use axum::{http::StatusCode, response::IntoResponse, Json};

/// Liveness check: the process is up and serving.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
