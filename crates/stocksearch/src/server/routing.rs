//! Axum router configuration for all endpoints

use axum::{
  middleware,
  routing::{get, post},
  Router,
};

use crate::server::handlers::{logs, page, search, status};
use crate::server::middleware::request_context_middleware;
use crate::server::startup::AppState;

/// Every route the server answers, for `/api`
pub const ENDPOINTS: &[&str] =
  &["GET /", "POST /search", "GET /status", "GET /version", "GET /api", "GET /api/schema", "GET /logs"];

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
  Router::new()
    // Search page and JSON search
    .route("/", get(page::search_page))
    .route("/search", post(search::search_stocks))
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    .route("/api", get(status::api_info))
    .route("/api/schema", get(status::api_schema))
    .route("/logs", get(logs::get_logs))
    .layer(middleware::from_fn_with_state(state.clone(), request_context_middleware))
    .with_state(state)
}
