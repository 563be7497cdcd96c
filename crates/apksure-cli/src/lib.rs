use apksure_api_client::{WorkflowState, WorkflowStatus};
use serde::Serialize;

/// Final output of `apksure analyze`
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AnalysisReport {
    pub file: Option<String>,
    pub size: Option<String>,
    pub jobid: Option<String>,
    pub status: WorkflowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<AppSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The four fields shown for an analysed app
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AppSummary {
    pub name: String,
    pub package: String,
    /// `version_name (version_code)`
    pub version: String,
    pub sha256: String,
}

impl AnalysisReport {
    pub fn from_state(state: &WorkflowState) -> Self {
        let error = match state.status {
            WorkflowStatus::TimedOut => Some(format!(
                "No result after {} status checks",
                state.polls
            )),
            _ => state.error.clone(),
        };

        Self {
            file: state.artifact.as_ref().map(|a| a.filename.clone()),
            size: state.artifact.as_ref().map(|a| a.size_label()),
            jobid: state.jobid.clone(),
            status: state.status,
            app: state.result.as_ref().map(|app| AppSummary {
                name: app.name.clone(),
                package: app.package.clone(),
                version: format!("{} ({})", app.version_name, app.version_code),
                sha256: app.apk_sha256.clone(),
            }),
            error,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == WorkflowStatus::Complete
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
