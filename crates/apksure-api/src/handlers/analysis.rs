//! Authenticated proxy in front of the external analysis backend

use crate::auth::SessionContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use apksure_core::models::{JobStatusResponse, JobSubmission};
use apksure_core::AppError;
use apksure_services::analysis::APK_FIELD;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Submit an APK for analysis
#[utoipa::path(
    post,
    path = "/api/analyze",
    tag = "analysis",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Artifact accepted", body = JobSubmission),
        (status = 400, description = "Missing file or unsupported extension", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 502, description = "Analysis service failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(user_id = %session.user_id, operation = "submit_artifact")
)]
pub async fn submit_artifact(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut multipart = multipart?;
    let mut artifact: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(APK_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .ok_or_else(|| AppError::InvalidInput("Uploaded file has no filename".to_string()))?;
        state.validator.validate_extension(&filename)?;

        let bytes = field.bytes().await?;
        artifact = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) = artifact.ok_or_else(|| {
        AppError::InvalidInput(format!("Missing multipart field '{}'", APK_FIELD))
    })?;
    state.validator.validate_size(bytes.len())?;

    tracing::info!(filename = %filename, size = bytes.len(), "Forwarding artifact");
    let submission = state.analysis.submit(&filename, bytes).await?;

    Ok(Json(submission))
}

/// Poll the status of an analysis job
#[utoipa::path(
    get,
    path = "/api/analyze/{jobid}",
    tag = "analysis",
    params(("jobid" = String, Path, description = "Job identifier returned by submit")),
    responses(
        (status = 200, description = "Current job status", body = JobStatusResponse),
        (status = 400, description = "Malformed job id", body = ErrorResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse),
        (status = 502, description = "Analysis service failure", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %session.user_id, operation = "job_status"))]
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    session: SessionContext,
    Path(jobid): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let status = state.analysis.fetch_status(&jobid).await?;
    Ok(Json(status))
}
