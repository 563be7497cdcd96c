//! Upload/poll state machine
//!
//! `WorkflowState` holds no I/O. Each selection or reset starts a new epoch;
//! transitions that report the outcome of an upload or a poll carry the epoch
//! they were started under and are dropped when it is no longer current.

use crate::artifact::Artifact;
use apksure_core::{AppInfo, ArtifactValidator, ValidationError};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Initial,
    Uploading,
    Checking,
    Complete,
    Error,
    TimedOut,
}

impl WorkflowStatus {
    /// No further requests happen from a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Complete | WorkflowStatus::Error | WorkflowStatus::TimedOut
        )
    }
}

impl Display for WorkflowStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WorkflowStatus::Initial => write!(f, "initial"),
            WorkflowStatus::Uploading => write!(f, "uploading"),
            WorkflowStatus::Checking => write!(f, "checking"),
            WorkflowStatus::Complete => write!(f, "complete"),
            WorkflowStatus::Error => write!(f, "error"),
            WorkflowStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("No artifact selected")]
    NoArtifact,

    #[error("Analysis already started for this selection (status: {0})")]
    AlreadyStarted(WorkflowStatus),
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub status: WorkflowStatus,
    pub artifact: Option<Artifact>,
    pub jobid: Option<String>,
    pub result: Option<AppInfo>,
    pub error: Option<String>,
    /// Upload progress: 0 until the upload is accepted, then 100
    pub progress: u8,
    /// Status requests answered for the current job
    pub polls: u32,
    epoch: u64,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Choose a file. A rejected file leaves the state untouched.
    pub fn select(
        &mut self,
        artifact: Artifact,
        validator: &ArtifactValidator,
    ) -> Result<(), ValidationError> {
        validator.validate(&artifact.filename, artifact.len())?;

        *self = WorkflowState {
            artifact: Some(artifact),
            epoch: self.epoch + 1,
            ..WorkflowState::default()
        };
        Ok(())
    }

    /// Start the upload of the selected artifact. Allowed once per selection.
    pub fn begin_upload(&mut self) -> Result<(u64, Artifact), TransitionError> {
        let artifact = self.artifact.clone().ok_or(TransitionError::NoArtifact)?;
        if self.status != WorkflowStatus::Initial {
            return Err(TransitionError::AlreadyStarted(self.status));
        }

        self.status = WorkflowStatus::Uploading;
        self.progress = 0;
        Ok((self.epoch, artifact))
    }

    pub fn upload_succeeded(&mut self, epoch: u64, jobid: String) -> bool {
        if !self.is_current(epoch, WorkflowStatus::Uploading) {
            return false;
        }

        self.status = WorkflowStatus::Checking;
        self.jobid = Some(jobid);
        self.progress = 100;
        true
    }

    /// Count a non-terminal poll answer.
    pub fn record_poll(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch, WorkflowStatus::Checking) {
            return false;
        }

        self.polls += 1;
        true
    }

    pub fn poll_complete(&mut self, epoch: u64, app: AppInfo) -> bool {
        if !self.is_current(epoch, WorkflowStatus::Checking) {
            return false;
        }

        self.polls += 1;
        self.status = WorkflowStatus::Complete;
        self.result = Some(app);
        true
    }

    /// Upload or poll failure. The result stays empty.
    pub fn fail(&mut self, epoch: u64, reason: impl Into<String>) -> bool {
        if epoch != self.epoch
            || !matches!(
                self.status,
                WorkflowStatus::Uploading | WorkflowStatus::Checking
            )
        {
            return false;
        }

        self.status = WorkflowStatus::Error;
        self.error = Some(reason.into());
        true
    }

    pub fn time_out(&mut self, epoch: u64) -> bool {
        if !self.is_current(epoch, WorkflowStatus::Checking) {
            return false;
        }

        self.status = WorkflowStatus::TimedOut;
        true
    }

    /// Back to `Initial` with nothing selected. Outstanding work becomes stale.
    pub fn reset(&mut self) {
        *self = WorkflowState {
            epoch: self.epoch + 1,
            ..WorkflowState::default()
        };
    }

    fn is_current(&self, epoch: u64, expected: WorkflowStatus) -> bool {
        epoch == self.epoch && self.status == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> AppInfo {
        AppInfo {
            name: "Foo".to_string(),
            package: "com.foo".to_string(),
            version_name: "1.0".to_string(),
            version_code: 1,
            apk_sha256: "abc123".to_string(),
        }
    }

    fn selected() -> WorkflowState {
        let mut state = WorkflowState::new();
        state
            .select(Artifact::new("app.apk", vec![1u8; 16]), &ArtifactValidator::apk())
            .expect("select");
        state
    }

    #[test]
    fn test_happy_path() {
        let mut state = selected();
        assert_eq!(state.status, WorkflowStatus::Initial);

        let (epoch, artifact) = state.begin_upload().expect("begin");
        assert_eq!(artifact.filename, "app.apk");
        assert_eq!(state.status, WorkflowStatus::Uploading);
        assert_eq!(state.progress, 0);

        assert!(state.upload_succeeded(epoch, "job-1".to_string()));
        assert_eq!(state.status, WorkflowStatus::Checking);
        assert_eq!(state.progress, 100);
        assert_eq!(state.jobid.as_deref(), Some("job-1"));

        assert!(state.record_poll(epoch));
        assert!(state.poll_complete(epoch, app()));
        assert_eq!(state.status, WorkflowStatus::Complete);
        assert_eq!(state.polls, 2);
        assert_eq!(state.result, Some(app()));
    }

    #[test]
    fn test_rejected_extension_keeps_state() {
        let mut state = selected();
        let epoch = state.epoch();

        let err = state
            .select(Artifact::new("notes.txt", vec![1u8; 4]), &ArtifactValidator::apk())
            .expect_err("txt rejected");
        assert!(matches!(err, ValidationError::InvalidExtension { .. }));
        assert_eq!(state.epoch(), epoch);
        assert_eq!(
            state.artifact.as_ref().map(|a| a.filename.as_str()),
            Some("app.apk")
        );
    }

    #[test]
    fn test_upload_starts_once_per_selection() {
        let mut state = selected();
        state.begin_upload().expect("first");
        assert_eq!(
            state.begin_upload().map(|(epoch, _)| epoch),
            Err(TransitionError::AlreadyStarted(WorkflowStatus::Uploading))
        );

        let mut empty = WorkflowState::new();
        assert_eq!(
            empty.begin_upload().map(|(epoch, _)| epoch),
            Err(TransitionError::NoArtifact)
        );
    }

    #[test]
    fn test_reselect_discards_previous_job() {
        let mut state = selected();
        let (epoch, _) = state.begin_upload().expect("begin");
        state.upload_succeeded(epoch, "job-1".to_string());

        state
            .select(Artifact::new("other.apk", vec![2u8; 8]), &ArtifactValidator::apk())
            .expect("select");
        assert_eq!(state.status, WorkflowStatus::Initial);
        assert!(state.jobid.is_none());
        assert_eq!(state.progress, 0);
        assert!(!state.poll_complete(epoch, app()));
        assert!(state.result.is_none());
    }

    #[test]
    fn test_reset_from_any_state() {
        for target in [
            WorkflowStatus::Uploading,
            WorkflowStatus::Checking,
            WorkflowStatus::Complete,
            WorkflowStatus::Error,
            WorkflowStatus::TimedOut,
        ] {
            let mut state = selected();
            let (epoch, _) = state.begin_upload().expect("begin");
            match target {
                WorkflowStatus::Uploading => {}
                WorkflowStatus::Error => {
                    state.fail(epoch, "network down");
                }
                _ => {
                    state.upload_succeeded(epoch, "job".to_string());
                    if target == WorkflowStatus::Complete {
                        state.poll_complete(epoch, app());
                    } else if target == WorkflowStatus::TimedOut {
                        state.time_out(epoch);
                    }
                }
            }
            assert_eq!(state.status, target);

            state.reset();
            assert_eq!(state.status, WorkflowStatus::Initial);
            assert!(state.artifact.is_none());
            assert!(state.jobid.is_none());
            assert!(state.result.is_none());
            assert!(state.error.is_none());
            assert_eq!(state.progress, 0);
        }
    }

    #[test]
    fn test_stale_results_ignored_after_reset() {
        let mut state = selected();
        let (epoch, _) = state.begin_upload().expect("begin");
        state.reset();

        assert!(!state.upload_succeeded(epoch, "job".to_string()));
        assert!(!state.fail(epoch, "late failure"));
        assert_eq!(state.status, WorkflowStatus::Initial);
        assert!(state.error.is_none());
    }

    #[test]
    fn test_fail_and_time_out_only_while_in_flight() {
        let mut state = selected();
        assert!(!state.fail(state.epoch(), "nothing in flight"));

        let (epoch, _) = state.begin_upload().expect("begin");
        assert!(!state.time_out(epoch));
        assert!(state.fail(epoch, "upload rejected"));
        assert_eq!(state.status, WorkflowStatus::Error);
        assert_eq!(state.error.as_deref(), Some("upload rejected"));
        assert!(state.result.is_none());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(WorkflowStatus::Complete.is_terminal());
        assert!(WorkflowStatus::Error.is_terminal());
        assert!(WorkflowStatus::TimedOut.is_terminal());
        assert!(!WorkflowStatus::Checking.is_terminal());
        assert_eq!(WorkflowStatus::TimedOut.to_string(), "timed_out");
    }
}
