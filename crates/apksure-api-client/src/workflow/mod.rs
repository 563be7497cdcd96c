//! Upload/poll workflow: pure state machine, poll policy and async driver.

mod driver;
mod policy;
mod state;

pub use driver::{UploadWorkflow, WorkflowError};
pub use policy::{Backoff, PollPolicy};
pub use state::{TransitionError, WorkflowState, WorkflowStatus};
