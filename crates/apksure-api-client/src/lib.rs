//! HTTP client for the APKSure API.
//!
//! Provides sign-in and registration, authenticated artifact submission and
//! job polling, and the upload/poll workflow that drives them. The CLI uses
//! this crate directly.

pub mod api;
pub mod artifact;
pub mod error;
pub mod session;
pub mod workflow;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use api::{AnalysisApi, AuthenticatedApi};
pub use artifact::Artifact;
pub use error::ClientError;
pub use session::Session;
pub use workflow::{
    Backoff, PollPolicy, UploadWorkflow, WorkflowError, WorkflowState, WorkflowStatus,
};

pub use apksure_core::models::{AppInfo, JobStatusResponse, JobSubmission};

/// HTTP client for the APKSure API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, Duration::from_secs(120))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET and deserialize the JSON response.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        session: Option<&Session>,
    ) -> Result<T, ClientError> {
        let request = self.client.get(self.build_url(path));
        self.send(authorize(request, session)).await
    }

    /// POST a JSON body and deserialize the response.
    pub(crate) async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
        session: Option<&Session>,
    ) -> Result<T, ClientError> {
        let request = self.client.post(self.build_url(path)).json(body);
        self.send(authorize(request, session)).await
    }

    /// POST a multipart form and deserialize the response.
    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        session: Option<&Session>,
    ) -> Result<T, ClientError> {
        let request = self.client.post(self.build_url(path)).multipart(form);
        self.send(authorize(request, session)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let response = check_status(response).await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn authorize(request: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
    match session {
        Some(session) => request.header(reqwest::header::AUTHORIZATION, session.bearer()),
        None => request,
    }
}

/// Turn a non-2xx response into `ClientError::Status`, preferring the server's `message`.
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);

    tracing::debug!(status = status.as_u16(), message = %message, "API request failed");
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
