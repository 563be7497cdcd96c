//! Outbound services used by the APKSure server.

pub mod analysis;

pub use analysis::{AnalysisClient, AnalysisError};
