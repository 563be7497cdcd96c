//! Client for the external APK analysis backend.
//!
//! The backend exposes two endpoints: `POST /upload` (multipart field `apk`)
//! returning `{jobid}`, and `GET /result/{jobid}` returning the job status.

use apksure_core::{AppError, JobStatusResponse, JobSubmission};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

pub const APK_MIME_TYPE: &str = "application/vnd.android.package-archive";

/// Multipart field name the backend reads the artifact from
pub const APK_FIELD: &str = "apk";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to reach analysis service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse analysis service response: {0}")]
    Decode(String),

    #[error("Invalid job id: {0:?}")]
    InvalidJobId(String),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidJobId(_) => AppError::InvalidInput(err.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

/// Job ids are opaque but end up in a URL path segment.
pub fn validate_job_id(jobid: &str) -> Result<(), AnalysisError> {
    let valid = !jobid.is_empty()
        && jobid.len() <= 128
        && jobid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid && jobid != "." && jobid != ".." {
        Ok(())
    } else {
        Err(AnalysisError::InvalidJobId(jobid.to_string()))
    }
}

#[derive(Clone)]
pub struct AnalysisClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl Debug for AnalysisClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnalysisClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnalysisClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url)
    }

    pub fn result_url(&self, jobid: &str) -> String {
        format!("{}/result/{}", self.base_url, jobid)
    }

    /// Submit an artifact; returns the job id issued by the backend.
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn submit(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<JobSubmission, AnalysisError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(APK_MIME_TYPE)?;
        let form = reqwest::multipart::Form::new().part(APK_FIELD, part);

        let response = self
            .http_client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = status.as_u16(), "Analysis upload rejected");
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let submission: JobSubmission = response
            .json()
            .await
            .map_err(|e| AnalysisError::Decode(e.to_string()))?;

        tracing::info!(jobid = %submission.jobid, "Artifact accepted by analysis service");
        Ok(submission)
    }

    /// Fetch the current status of a job.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_status(&self, jobid: &str) -> Result<JobStatusResponse, AnalysisError> {
        validate_job_id(jobid)?;

        let response = self.http_client.get(self.result_url(jobid)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let job_status: JobStatusResponse =
            serde_json::from_str(&text).map_err(|e| AnalysisError::Decode(e.to_string()))?;

        tracing::debug!(jobid = %jobid, status = %job_status.status, "Fetched job status");
        Ok(job_status)
    }
}
