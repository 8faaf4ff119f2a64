//! REST API types with schemars annotations for schema generation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SearchError;
use crate::index::IndexStats;
use crate::pipeline::{QueryResult, StockHit};
use crate::record::StockRecord;

pub use crate::logs::{LogContext, LogEntry};

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  pub latest: String,
  pub requested: String,
  pub resolved: String,
}

/// API error information
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, one of the stable [`SearchError::kind`] values for search failures
  pub key: String,

  /// Human readable error message
  pub message: String,

  #[serde(default)]
  pub context: serde_json::Value,
}

// Status/Version Endpoints
// =======================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  pub version: String,
}

/// Response for /api endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiInfoResponse {
  pub latest: String,
  pub versions: ApiVersions,
  /// Routes served by this process
  pub endpoints: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiVersions {
  pub latest: String,
  pub active: Vec<String>,
}

/// Response for /status endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  /// "healthy" when search is available, "degraded" otherwise
  pub status: String,
  pub version: String,
  pub search_enabled: bool,

  /// Why search is disabled, when it is
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub disabled_reason: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub model: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub namespace: Option<String>,

  /// Index statistics, when the index answered in time
  #[serde(skip_serializing_if = "Option::is_none", default)]
  pub index: Option<IndexStatsData>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IndexStatsData {
  pub dimension: usize,
  pub total_vector_count: u64,
  pub namespaces: std::collections::BTreeMap<String, u64>,
}

/// Response for /api/schema endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SchemaResponse {
  pub search_request: serde_json::Value,
  pub search_response: serde_json::Value,
}

// Logs Endpoint
// =============

/// Query parameters for /logs
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct LogsQuery {
  /// Maximum number of entries, newest first
  pub limit: Option<usize>,
  /// Level filter ("info", "warn", "error", "success" or "all")
  pub level: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LogsResponse {
  pub logs: Vec<LogEntry>,
}

// Search Types
// ============

/// Request for /search endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
  /// Free-text description of the stocks to find
  pub query: String,
}

/// Query string for the HTML page
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct PageQuery {
  #[serde(default)]
  pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchResultData {
  pub ticker: String,
  pub name: String,
  pub industry: String,
  pub sector: String,
  pub city: String,
  pub state: String,
  pub country: String,
  /// "City, State, Country"
  pub location: String,
  pub summary: String,
  /// Similarity score, only meaningful for ranking
  pub score: f32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
  /// The query after trimming
  pub query: String,
  /// Results in index order, best first
  pub results: Vec<SearchResultData>,
  pub count: usize,
}

// Conversions
// ===========

impl From<&StockHit> for SearchResultData {
  fn from(hit: &StockHit) -> Self {
    let StockRecord { ticker, name, industry, sector, city, state, country, summary } =
      hit.record.clone();
    Self {
      location: hit.record.location(),
      ticker,
      name,
      industry,
      sector,
      city,
      state,
      country,
      summary,
      score: hit.score,
    }
  }
}

impl From<&QueryResult> for SearchResponse {
  fn from(result: &QueryResult) -> Self {
    let results: Vec<SearchResultData> = result.hits.iter().map(SearchResultData::from).collect();
    Self { query: result.query.clone(), count: results.len(), results }
  }
}

impl From<IndexStats> for IndexStatsData {
  fn from(stats: IndexStats) -> Self {
    Self {
      dimension: stats.dimension,
      total_vector_count: stats.total_vector_count,
      namespaces: stats.namespaces,
    }
  }
}

// Helper Functions
// ================

fn current_version() -> VersionInfo {
  let version = env!("CARGO_PKG_VERSION");
  VersionInfo {
    latest: version.to_string(),
    requested: version.to_string(),
    resolved: version.to_string(),
  }
}

impl<T> BaseResponse<T> {
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: current_version(), transaction_id, errors: Vec::new(), data }
  }

  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: current_version(), transaction_id, errors, data: () }
  }
}

impl ApiError {
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string(), context: serde_json::Value::Null }
  }
}

impl From<&SearchError> for ApiError {
  fn from(error: &SearchError) -> Self {
    ApiError::new(error.kind(), &error.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::NOT_AVAILABLE;

  #[test]
  fn test_success_response_flattens_data() {
    let response = BaseResponse::success(VersionResponse { version: "1.2.3".to_string() }, Uuid::nil());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["version"], "1.2.3");
    assert!(json.get("errors").is_none());
    assert_eq!(json["versioning"]["latest"], env!("CARGO_PKG_VERSION"));
  }

  #[test]
  fn test_search_error_maps_to_api_error_key() {
    let error = ApiError::from(&SearchError::Embedding("bad input".to_string()));
    assert_eq!(error.key, "embedding_failed");
    assert!(error.message.contains("bad input"));
  }

  #[test]
  fn test_search_response_keeps_order_and_location() {
    let hit = |ticker: &str, score: f32| StockHit {
      record: StockRecord {
        ticker: ticker.to_string(),
        name: NOT_AVAILABLE.to_string(),
        industry: NOT_AVAILABLE.to_string(),
        sector: NOT_AVAILABLE.to_string(),
        city: "Austin".to_string(),
        state: "TX".to_string(),
        country: NOT_AVAILABLE.to_string(),
        summary: NOT_AVAILABLE.to_string(),
      },
      score,
    };
    let result = QueryResult { query: "ev".to_string(), hits: vec![hit("TSLA", 0.9), hit("RIVN", 0.8)] };

    let response = SearchResponse::from(&result);
    assert_eq!(response.count, 2);
    assert_eq!(response.results[0].ticker, "TSLA");
    assert_eq!(response.results[1].location, "Austin, TX, N/A");
  }
}
