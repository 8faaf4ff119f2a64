//! Status, version and schema endpoint handlers

use axum::{extract::State, response::Json};
use uuid::Uuid;

use crate::pipeline::SearchAvailability;
use crate::server::routing::ENDPOINTS;
use crate::server::startup::AppState;
use crate::server::types::{
  ApiInfoResponse, ApiVersions, BaseResponse, IndexStatsData, SchemaResponse, SearchRequest,
  SearchResponse, StatusResponse, VersionResponse,
};

/// GET /status - Health check, search availability and index statistics
pub async fn status(State(state): State<AppState>) -> Json<BaseResponse<StatusResponse>> {
  let transaction_id = Uuid::new_v4();
  let version = env!("CARGO_PKG_VERSION").to_string();

  let response = match state.search.as_ref() {
    SearchAvailability::Disabled(reason) => StatusResponse {
      status: "degraded".to_string(),
      version,
      search_enabled: false,
      disabled_reason: Some(reason.to_string()),
      model: None,
      namespace: None,
      index: None,
    },
    SearchAvailability::Ready(pipeline) => {
      let index = match pipeline.index_stats().await {
        Ok(stats) => Some(IndexStatsData::from(stats)),
        Err(e) => {
          state.logs.warn(&format!("Index statistics unavailable: {e}"), "status-api");
          None
        }
      };

      StatusResponse {
        status: "healthy".to_string(),
        version,
        search_enabled: true,
        disabled_reason: None,
        model: Some(pipeline.model_name().to_string()),
        namespace: Some(pipeline.settings().namespace.clone()),
        index,
      }
    }
  };

  Json(BaseResponse::success(response, transaction_id))
}

/// GET /version - Returns current API version
pub async fn version() -> Json<BaseResponse<VersionResponse>> {
  let transaction_id = Uuid::new_v4();
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };

  Json(BaseResponse::success(response, transaction_id))
}

/// GET /api - Returns API information and supported versions
pub async fn api_info() -> Json<BaseResponse<ApiInfoResponse>> {
  let transaction_id = Uuid::new_v4();
  let version = env!("CARGO_PKG_VERSION");
  let response = ApiInfoResponse {
    latest: version.to_string(),
    versions: ApiVersions { latest: version.to_string(), active: vec![version.to_string()] },
    endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
  };

  Json(BaseResponse::success(response, transaction_id))
}

/// GET /api/schema - JSON schemas of the search request and response
pub async fn api_schema() -> Json<BaseResponse<SchemaResponse>> {
  let transaction_id = Uuid::new_v4();
  let response = SchemaResponse {
    search_request: serde_json::to_value(schemars::schema_for!(SearchRequest)).unwrap_or_default(),
    search_response: serde_json::to_value(schemars::schema_for!(SearchResponse))
      .unwrap_or_default(),
  };

  Json(BaseResponse::success(response, transaction_id))
}
