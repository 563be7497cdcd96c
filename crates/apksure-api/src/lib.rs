//! APKSure API Library
//!
//! HTTP handlers, session auth and application setup.

mod api_doc;
mod handlers;
mod telemetry;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use api_doc::get_openapi_spec;
pub use error::ErrorResponse;
pub use setup::routes::setup_routes;
pub use state::AppState;
