//! APKSure user store
//!
//! `UserStore` is the seam between the auth gate and persistence. The
//! PostgreSQL repository backs deployments; the in-memory store backs tests
//! and local runs without a database.

pub mod db;

pub use db::memory::MemoryUserStore;
pub use db::user::{UserRepository, UserStore};
