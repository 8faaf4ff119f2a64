//! REST API module for the stock search service
//!
//! Serves the HTML search page and a JSON search endpoint over axum, with
//! status, version, schema and log endpoints alongside.

pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod startup;
pub mod types;

pub use startup::{start_server, AppState};
