//! Async driver for the upload/poll state machine.

use super::policy::PollPolicy;
use super::state::{TransitionError, WorkflowState, WorkflowStatus};
use crate::api::AnalysisApi;
use crate::artifact::Artifact;
use crate::error::ClientError;
use apksure_core::{ArtifactValidator, ValidationError};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Upload failed: {0}")]
    Upload(#[source] ClientError),
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollTask {
    fn stop(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Drives one selection at a time through upload and polling.
///
/// At most one poll task exists. Selecting a new file, resetting and dropping
/// the workflow all stop it.
pub struct UploadWorkflow<A: AnalysisApi> {
    api: Arc<A>,
    policy: PollPolicy,
    validator: ArtifactValidator,
    state: Arc<watch::Sender<WorkflowState>>,
    poll: Mutex<Option<PollTask>>,
}

impl<A: AnalysisApi> UploadWorkflow<A> {
    pub fn new(api: A, policy: PollPolicy, validator: ArtifactValidator) -> Self {
        let (state, _) = watch::channel(WorkflowState::new());
        Self {
            api: Arc::new(api),
            policy,
            validator,
            state: Arc::new(state),
            poll: Mutex::new(None),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    /// Receive every state change
    pub fn watch(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// Select a file; a rejected file changes nothing.
    pub async fn select(&self, artifact: Artifact) -> Result<(), ValidationError> {
        self.validator.validate(&artifact.filename, artifact.len())?;

        let mut poll = self.poll.lock().await;
        if let Some(task) = poll.take() {
            task.stop();
        }

        let mut outcome = Ok(());
        self.state.send_modify(|state| {
            outcome = state.select(artifact, &self.validator);
        });
        if outcome.is_ok() {
            tracing::debug!(epoch = self.state.borrow().epoch(), "Artifact selected");
        }
        outcome
    }

    /// Upload the selected artifact and start polling its job.
    ///
    /// Runs at most once per selection. An upload failure moves the workflow
    /// to `Error` and is also returned.
    pub async fn analyze(&self) -> Result<(), WorkflowError> {
        let mut started = Err(TransitionError::NoArtifact);
        self.state.send_if_modified(|state| {
            started = state.begin_upload();
            started.is_ok()
        });
        let (epoch, artifact) = started?;

        tracing::info!(
            filename = %artifact.filename,
            size = %artifact.size_label(),
            "Uploading artifact"
        );

        let submission = match self.api.submit(&artifact).await {
            Ok(submission) => submission,
            Err(err) => {
                tracing::warn!(error = %err, "Upload failed");
                self.state
                    .send_if_modified(|state| state.fail(epoch, err.to_string()));
                return Err(WorkflowError::Upload(err));
            }
        };

        // Hold the slot so a concurrent reset cannot slip between the
        // transition and the spawn.
        let mut poll = self.poll.lock().await;
        let jobid = submission.jobid;
        let accepted = self
            .state
            .send_if_modified(|state| state.upload_succeeded(epoch, jobid.clone()));
        if !accepted {
            tracing::debug!(jobid = %jobid, "Upload finished after the selection changed");
            return Ok(());
        }

        tracing::info!(jobid = %jobid, "Upload accepted, polling for result");
        if let Some(previous) = poll.take() {
            previous.stop();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_job(
            self.api.clone(),
            self.state.clone(),
            self.policy,
            jobid,
            epoch,
            cancel.clone(),
        ));
        *poll = Some(PollTask { cancel, handle });

        Ok(())
    }

    /// Back to `Initial`; any pending poll is cancelled before this returns.
    pub async fn reset(&self) {
        let mut poll = self.poll.lock().await;
        if let Some(task) = poll.take() {
            task.stop();
        }
        self.state.send_modify(|state| state.reset());
        tracing::debug!("Workflow reset");
    }

    /// Whether a poll is scheduled for the current job.
    pub async fn pending_poll(&self) -> bool {
        let poll = self.poll.lock().await;
        let running = poll
            .as_ref()
            .map(|task| !task.cancel.is_cancelled() && !task.handle.is_finished())
            .unwrap_or(false);
        running && self.state.borrow().status == WorkflowStatus::Checking
    }

    /// Resolves once the current job settles or the workflow returns to `Initial`.
    pub async fn wait(&self) -> WorkflowState {
        let mut rx = self.state.subscribe();
        let settled = rx
            .wait_for(|state| {
                state.status.is_terminal() || state.status == WorkflowStatus::Initial
            })
            .await
            .map(|state| state.clone());

        // The sender lives in `self`, so the channel cannot close while we wait.
        settled.unwrap_or_else(|_| self.snapshot())
    }
}

impl<A: AnalysisApi> Drop for UploadWorkflow<A> {
    fn drop(&mut self) {
        if let Some(task) = self.poll.get_mut().take() {
            task.stop();
        }
    }
}

/// One request per tick; the next wait starts only after the previous request settles.
async fn poll_job<A: AnalysisApi>(
    api: Arc<A>,
    state: Arc<watch::Sender<WorkflowState>>,
    policy: PollPolicy,
    jobid: String,
    epoch: u64,
    cancel: CancellationToken,
) {
    let started = Instant::now();

    for attempt in 0..policy.max_attempts {
        let delay = policy.delay_for(attempt);
        if !policy.within_deadline(started.elapsed(), delay) {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return,
            response = api.status(&jobid) => response,
        };

        match response {
            Ok(status) if status.is_complete() => {
                match status.app().cloned() {
                    Some(app) => {
                        tracing::info!(jobid = %jobid, package = %app.package, "Analysis complete");
                        state.send_if_modified(|s| s.poll_complete(epoch, app));
                    }
                    None => {
                        tracing::warn!(jobid = %jobid, "Complete status without app info");
                        state.send_if_modified(|s| {
                            s.fail(epoch, "Analysis completed without app details")
                        });
                    }
                }
                return;
            }
            Ok(status) => {
                tracing::debug!(jobid = %jobid, attempt, status = %status.status, "Job still running");
                if !state.send_if_modified(|s| s.record_poll(epoch)) {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(jobid = %jobid, error = %err, "Status check failed");
                state.send_if_modified(|s| s.fail(epoch, err.to_string()));
                return;
            }
        }
    }

    tracing::warn!(
        jobid = %jobid,
        max_attempts = policy.max_attempts,
        elapsed_secs = started.elapsed().as_secs(),
        "Gave up waiting for analysis"
    );
    state.send_if_modified(|s| s.time_out(epoch));
}
