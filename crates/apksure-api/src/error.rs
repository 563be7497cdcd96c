//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything that
//! converts into `AppError` converts into `HttpAppError` and renders with the
//! same status, body and log level.

use apksure_core::{AppError, ErrorMetadata, LogLevel};
use apksure_services::AnalysisError;
use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Client-facing message, e.g. `Invalid credentials.`
    pub message: String,
    /// Underlying error; only present for server faults outside production
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(err: &AppError, is_production: bool) -> Self {
        // Client errors carry their own message. Only non-sensitive 5xx get
        // the raw detail, and never in production.
        let error = if !is_production && err.http_status_code() >= 500 && !err.is_sensitive() {
            Some(err.detailed_message())
        } else {
            None
        };

        Self {
            message: err.client_message(),
            error,
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse (orphan rule)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(err.into())
    }
}

impl From<AnalysisError> for HttpAppError {
    fn from(err: AnalysisError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<apksure_core::ValidationError> for HttpAppError {
    fn from(err: apksure_core::ValidationError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<validator::ValidationErrors> for HttpAppError {
    fn from(err: validator::ValidationErrors) -> Self {
        HttpAppError(err.into())
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartRejection> for HttpAppError {
    fn from(rejection: MultipartRejection) -> Self {
        HttpAppError(AppError::BadRequest(format!(
            "Expected a multipart/form-data body: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        let app = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::BadRequest(format!("Failed to read multipart body: {}", err.body_text()))
        };
        HttpAppError(app)
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse::from_app_error(app_error, is_production_env());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_body_has_message_only() {
        let body = ErrorResponse::from_app_error(
            &AppError::Unauthorized("Invalid credentials.".to_string()),
            false,
        );
        let json = serde_json::to_value(&body).expect("serialize");
        assert_eq!(json["message"], "Invalid credentials.");
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_server_fault_attaches_detail_outside_production() {
        let err = AppError::Internal("pool timed out".to_string());

        let dev = ErrorResponse::from_app_error(&err, false);
        assert_eq!(dev.message, "Server error");
        assert!(dev.error.as_deref().unwrap_or_default().contains("pool timed out"));

        let prod = ErrorResponse::from_app_error(&err, true);
        assert_eq!(prod.message, "Server error");
        assert!(prod.error.is_none());
    }

    #[test]
    fn test_sensitive_faults_never_attach_detail() {
        let db = ErrorResponse::from_app_error(&AppError::Database(sqlx::Error::PoolTimedOut), false);
        assert_eq!(db.message, "Server error");
        assert_eq!(db.code, "DATABASE_ERROR");
        assert!(db.error.is_none());

        let upstream = ErrorResponse::from_app_error(
            &AppError::Upstream("status 503: internal host 10.0.0.4".to_string()),
            false,
        );
        assert_eq!(upstream.message, "Analysis service unavailable");
        assert!(upstream.error.is_none());
    }

    #[test]
    fn test_from_analysis_error() {
        let HttpAppError(app_err) = AnalysisError::Status {
            status: 503,
            body: "down".to_string(),
        }
        .into();
        assert!(matches!(app_err, AppError::Upstream(_)));
    }

    #[test]
    fn test_from_validation_error() {
        let HttpAppError(app_err) = apksure_core::ValidationError::FileTooLarge {
            size: 100,
            max: 10,
        }
        .into();
        assert_eq!(app_err.http_status_code(), 413);
    }
}
