//! Database repositories for data access layer

pub mod memory;
pub mod user;
