//! Domain methods for the APKSure API client.

use crate::artifact::Artifact;
use crate::error::ClientError;
use crate::session::Session;
use crate::ApiClient;
use apksure_core::models::{
    JobStatusResponse, JobSubmission, RegisterRequest, RegisterResponse, SignInRequest,
    SignInResponse,
};
use async_trait::async_trait;

const APK_FIELD: &str = "apk";
const APK_MIME_TYPE: &str = "application/vnd.android.package-archive";

impl ApiClient {
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, ClientError> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post_json("/api/register", &body, None).await
    }

    /// Sign in; the returned session authorizes analysis requests.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: SignInResponse = self.post_json("/api/signin", &body, None).await?;
        tracing::debug!(message = %response.message, "Signed in");

        Ok(Session::from_response(email, response))
    }

    /// Upload an artifact; returns the job id to poll.
    pub async fn submit_artifact(
        &self,
        session: &Session,
        artifact: &Artifact,
    ) -> Result<JobSubmission, ClientError> {
        let part =
            reqwest::multipart::Part::stream_with_length(artifact.bytes.clone(), artifact.len() as u64)
                .file_name(artifact.filename.clone())
                .mime_str(APK_MIME_TYPE)?;
        let form = reqwest::multipart::Form::new().part(APK_FIELD, part);

        self.post_multipart("/api/analyze", form, Some(session))
            .await
    }

    pub async fn job_status(
        &self,
        session: &Session,
        jobid: &str,
    ) -> Result<JobStatusResponse, ClientError> {
        self.get(&format!("/api/analyze/{}", jobid), Some(session))
            .await
    }
}

/// Transport seen by the upload workflow.
#[async_trait]
pub trait AnalysisApi: Send + Sync + 'static {
    async fn submit(&self, artifact: &Artifact) -> Result<JobSubmission, ClientError>;

    async fn status(&self, jobid: &str) -> Result<JobStatusResponse, ClientError>;
}

/// `ApiClient` bound to a session.
#[derive(Clone, Debug)]
pub struct AuthenticatedApi {
    client: ApiClient,
    session: Session,
}

impl AuthenticatedApi {
    pub fn new(client: ApiClient, session: Session) -> Self {
        Self { client, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl AnalysisApi for AuthenticatedApi {
    async fn submit(&self, artifact: &Artifact) -> Result<JobSubmission, ClientError> {
        self.client.submit_artifact(&self.session, artifact).await
    }

    async fn status(&self, jobid: &str) -> Result<JobStatusResponse, ClientError> {
        self.client.job_status(&self.session, jobid).await
    }
}
