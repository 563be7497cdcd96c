//! OpenAPI documentation.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use apksure_core::models;

/// Registers the bearer scheme referenced by the analysis routes.
struct SessionSecurity;

impl Modify for SessionSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "APKSure API",
        version = "0.1.0",
        description = "Sign in, submit Android packages for analysis and poll the analysis result."
    ),
    paths(
        handlers::health::health_check,
        // Auth
        handlers::auth::signin,
        handlers::auth::register,
        // Analysis
        handlers::analysis::submit_artifact,
        handlers::analysis::job_status,
    ),
    components(
        schemas(
            models::SignInRequest,
            models::SignInResponse,
            models::RegisterRequest,
            models::RegisterResponse,
            models::JobSubmission,
            models::JobStatusResponse,
            models::AnalysisResult,
            models::AppInfo,
            error::ErrorResponse,
        )
    ),
    modifiers(&SessionSecurity),
    tags(
        (name = "auth", description = "Sign-in and registration"),
        (name = "analysis", description = "APK submission and job status"),
        (name = "health", description = "Health checks")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
