//! APKSure Core Library
//!
//! Domain models, error types, configuration and artifact validation shared by
//! the server, the user store and the client workflow.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ServerConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{normalize_email, AppInfo, JobStatusResponse, JobSubmission, User};
pub use validation::{format_bytes, ArtifactValidator, ValidationError};
