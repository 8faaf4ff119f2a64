//! Pinecone REST client
//!
//! Talks to two endpoints: the controller (`api.pinecone.io`) to discover an
//! index's data-plane host, and that host for `query` and `describe_index_stats`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{
  header::{HeaderMap, HeaderValue, CONTENT_TYPE},
  Client, Response,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::{IndexStats, Match, VectorIndex};
use crate::config::{ApiKey, Config, DEFAULT_CONTROLLER_URL, DEFAULT_INDEX_TIMEOUT};
use crate::error::SearchError;

const API_VERSION: &str = "2024-07";

/// Metadata key the loader stored the description text under
pub const TEXT_KEY: &str = "text";

/// Options for connecting to a Pinecone index
#[derive(Debug, Clone)]
pub struct PineconeOptions {
  pub api_key: ApiKey,
  pub index_name: String,
  /// Data-plane host; looked up through the controller when `None`
  pub index_host: Option<String>,
  pub controller_url: String,
  /// Per-request timeout for every call
  pub timeout: Duration,
}

impl PineconeOptions {
  pub fn new(api_key: ApiKey, index_name: impl Into<String>) -> Self {
    Self {
      api_key,
      index_name: index_name.into(),
      index_host: None,
      controller_url: DEFAULT_CONTROLLER_URL.to_string(),
      timeout: DEFAULT_INDEX_TIMEOUT,
    }
  }
}

impl From<&Config> for PineconeOptions {
  fn from(config: &Config) -> Self {
    Self {
      api_key: config.api_key.clone(),
      index_name: config.index_name.clone(),
      index_host: config.index_host.clone(),
      controller_url: config.controller_url.clone(),
      timeout: config.index_timeout,
    }
  }
}

pub struct PineconeIndex {
  client: Client,
  host: String,
  api_key: ApiKey,
  /// Dimension reported by the controller, when it was consulted
  dimension: Option<usize>,
}

// Wire types
// ==========

#[derive(Debug, Deserialize)]
struct IndexDescription {
  host: String,
  #[serde(default)]
  dimension: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
  vector: &'a [f32],
  top_k: usize,
  namespace: &'a str,
  include_metadata: bool,
  include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
  #[serde(default)]
  matches: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
  id: String,
  #[serde(default)]
  score: f32,
  #[serde(default)]
  metadata: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
  #[serde(default)]
  dimension: usize,
  #[serde(default)]
  total_vector_count: u64,
  #[serde(default)]
  namespaces: HashMap<String, NamespaceSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
  #[serde(default)]
  vector_count: u64,
}

impl PineconeIndex {
  /// Build the HTTP client and resolve the index host
  pub async fn connect(options: PineconeOptions) -> Result<Self> {
    let client = Client::builder()
      .timeout(options.timeout)
      .build()
      .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

    let (host, dimension) = match &options.index_host {
      Some(host) => (normalize_host(host), None),
      None => {
        let description = describe_index(&client, &options).await?;
        (normalize_host(&description.host), description.dimension)
      }
    };

    tracing::info!(index = %options.index_name, host = %host, "connected to Pinecone index");

    Ok(Self { client, host, api_key: options.api_key, dimension })
  }

  pub fn host(&self) -> &str {
    &self.host
  }

  pub fn dimension(&self) -> Option<usize> {
    self.dimension
  }

  fn headers(&self) -> Result<HeaderMap> {
    auth_headers(&self.api_key)
  }

  async fn post(&self, path: &str, body: &impl Serialize) -> Result<Response> {
    let url = format!("{}{}", self.host, path);
    let response = self
      .client
      .post(&url)
      .headers(self.headers()?)
      .json(body)
      .send()
      .await
      .map_err(describe_transport_error)?;
    ensure_success(response).await
  }

  async fn query(&self, vector: &[f32], k: usize, namespace: &str) -> Result<Vec<Match>> {
    let request = QueryRequest {
      vector,
      top_k: k,
      namespace,
      include_metadata: true,
      include_values: false,
    };

    let response: QueryResponse = self
      .post("/query", &request)
      .await?
      .json()
      .await
      .map_err(|e| anyhow!("Failed to parse Pinecone query response: {}", e))?;

    Ok(response.matches.into_iter().map(into_match).collect())
  }

  async fn stats(&self) -> Result<IndexStats> {
    let response: StatsResponse = self
      .post("/describe_index_stats", &json!({}))
      .await?
      .json()
      .await
      .map_err(|e| anyhow!("Failed to parse Pinecone stats response: {}", e))?;

    Ok(IndexStats {
      dimension: response.dimension,
      total_vector_count: response.total_vector_count,
      namespaces: response
        .namespaces
        .into_iter()
        .map(|(name, summary)| (name, summary.vector_count))
        .collect(),
    })
  }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
  async fn similarity_search(
    &self,
    vector: &[f32],
    k: usize,
    namespace: &str,
  ) -> Result<Vec<Match>, SearchError> {
    self.query(vector, k, namespace).await.map_err(|e| SearchError::Index(e.to_string()))
  }

  async fn describe_stats(&self) -> Result<IndexStats, SearchError> {
    self.stats().await.map_err(|e| SearchError::Index(e.to_string()))
  }
}

/// Ask the controller where the index lives
async fn describe_index(client: &Client, options: &PineconeOptions) -> Result<IndexDescription> {
  let url = format!(
    "{}/indexes/{}",
    options.controller_url.trim_end_matches('/'),
    options.index_name
  );

  let response = client
    .get(&url)
    .headers(auth_headers(&options.api_key)?)
    .send()
    .await
    .map_err(describe_transport_error)?;

  ensure_success(response)
    .await?
    .json()
    .await
    .map_err(|e| anyhow!("Failed to parse index description: {}", e))
}

fn auth_headers(api_key: &ApiKey) -> Result<HeaderMap> {
  let mut headers = HeaderMap::new();
  let mut key = HeaderValue::from_str(api_key.expose())
    .map_err(|_| anyhow!("API key contains characters not allowed in a header"))?;
  key.set_sensitive(true);
  headers.insert("api-key", key);
  headers.insert("x-pinecone-api-version", HeaderValue::from_static(API_VERSION));
  headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
  Ok(headers)
}

async fn ensure_success(response: Response) -> Result<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  Err(anyhow!("Pinecone returned {}: {}", status, body.trim()))
}

fn describe_transport_error(e: reqwest::Error) -> anyhow::Error {
  if e.is_timeout() {
    anyhow!("request to Pinecone timed out")
  } else {
    anyhow!("request to Pinecone failed: {}", e)
  }
}

fn normalize_host(host: &str) -> String {
  let host = host.trim().trim_end_matches('/');
  if host.starts_with("http://") || host.starts_with("https://") {
    host.to_string()
  } else {
    format!("https://{host}")
  }
}

fn into_match(raw: RawMatch) -> Match {
  let mut metadata: BTreeMap<String, String> = raw
    .metadata
    .unwrap_or_default()
    .into_iter()
    .filter_map(|(key, value)| metadata_value_to_string(&value).map(|v| (key, v)))
    .collect();

  let content = metadata.remove(TEXT_KEY);

  Match { id: raw.id, score: raw.score, metadata, content }
}

fn metadata_value_to_string(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    Value::Array(items) => {
      Some(items.iter().filter_map(metadata_value_to_string).collect::<Vec<_>>().join(", "))
    }
    other => Some(other.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::{Matcher, Server};

  fn options_for(server: &Server) -> PineconeOptions {
    PineconeOptions {
      api_key: ApiKey::new("test-key"),
      index_name: "stocks".to_string(),
      index_host: Some(server.url()),
      controller_url: server.url(),
      timeout: Duration::from_secs(5),
    }
  }

  #[test]
  fn test_normalize_host_adds_scheme() {
    assert_eq!(normalize_host("stocks-abc.svc.pinecone.io"), "https://stocks-abc.svc.pinecone.io");
    assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
  }

  #[test]
  fn test_metadata_values_stringified() {
    assert_eq!(metadata_value_to_string(&json!("AAPL")), Some("AAPL".to_string()));
    assert_eq!(metadata_value_to_string(&json!(42)), Some("42".to_string()));
    assert_eq!(metadata_value_to_string(&json!(true)), Some("true".to_string()));
    assert_eq!(metadata_value_to_string(&json!(["a", "b"])), Some("a, b".to_string()));
    assert_eq!(metadata_value_to_string(&Value::Null), None);
  }

  #[test]
  fn test_into_match_moves_text_to_content() {
    let raw = RawMatch {
      id: "MSFT".to_string(),
      score: 0.5,
      metadata: Some(HashMap::from([
        ("Ticker".to_string(), json!("MSFT")),
        ("text".to_string(), json!("Makes software.")),
        ("City".to_string(), Value::Null),
      ])),
    };
    let m = into_match(raw);
    assert_eq!(m.content.as_deref(), Some("Makes software."));
    assert_eq!(m.metadata.get("Ticker").map(String::as_str), Some("MSFT"));
    assert!(!m.metadata.contains_key("text"));
    assert!(!m.metadata.contains_key("City"));
  }

  #[tokio::test]
  async fn test_connect_resolves_host_from_controller() {
    let mut server = Server::new_async().await;
    let body = json!({
      "name": "stocks",
      "dimension": 768,
      "metric": "cosine",
      "host": "stocks-abc123.svc.aped-4627-b74a.pinecone.io",
      "status": { "ready": true, "state": "Ready" }
    });
    let _mock = server
      .mock("GET", "/indexes/stocks")
      .match_header("api-key", "test-key")
      .match_header("x-pinecone-api-version", API_VERSION)
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body.to_string())
      .create_async()
      .await;

    let mut options = options_for(&server);
    options.index_host = None;

    let index = PineconeIndex::connect(options).await.unwrap();
    assert_eq!(index.host(), "https://stocks-abc123.svc.aped-4627-b74a.pinecone.io");
    assert_eq!(index.dimension(), Some(768));
  }

  #[tokio::test]
  async fn test_connect_fails_for_unknown_index() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("GET", "/indexes/stocks")
      .with_status(404)
      .with_body(r#"{"error":{"code":"NOT_FOUND","message":"Resource stocks not found"}}"#)
      .create_async()
      .await;

    let mut options = options_for(&server);
    options.index_host = None;

    let err = PineconeIndex::connect(options).await.err().unwrap();
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("not found"));
  }

  #[tokio::test]
  async fn test_query_preserves_order_and_metadata() {
    let mut server = Server::new_async().await;
    let body = json!({
      "matches": [
        {
          "id": "NVDA",
          "score": 0.91,
          "metadata": {
            "Name": "NVIDIA Corporation",
            "Ticker": "NVDA",
            "Sector": "Technology",
            "text": "Designs GPUs for AI workloads."
          }
        },
        { "id": "AMD", "score": 0.84, "metadata": { "Ticker": "AMD" } },
        { "id": "INTC", "score": 0.77 }
      ],
      "namespace": "stock-descriptions",
      "usage": { "readUnits": 5 }
    });
    let mock = server
      .mock("POST", "/query")
      .match_header("api-key", "test-key")
      .match_body(Matcher::PartialJson(json!({
        "topK": 5,
        "namespace": "stock-descriptions",
        "includeMetadata": true,
        "includeValues": false
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(body.to_string())
      .create_async()
      .await;

    let index = PineconeIndex::connect(options_for(&server)).await.unwrap();
    let matches = index.similarity_search(&[0.1, 0.2], 5, "stock-descriptions").await.unwrap();

    mock.assert_async().await;
    let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["NVDA", "AMD", "INTC"]);
    assert_eq!(matches[0].content.as_deref(), Some("Designs GPUs for AI workloads."));
    assert_eq!(matches[0].metadata.get("Name").map(String::as_str), Some("NVIDIA Corporation"));
    assert!(matches[2].metadata.is_empty());
  }

  #[tokio::test]
  async fn test_query_empty_matches_is_ok() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/query")
      .with_status(200)
      .with_body(r#"{"matches":[],"namespace":""}"#)
      .create_async()
      .await;

    let index = PineconeIndex::connect(options_for(&server)).await.unwrap();
    let matches = index.similarity_search(&[0.0; 4], 5, "").await.unwrap();
    assert!(matches.is_empty());
  }

  #[tokio::test]
  async fn test_query_unauthorized_is_index_error() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/query")
      .with_status(401)
      .with_body("Invalid API Key")
      .create_async()
      .await;

    let index = PineconeIndex::connect(options_for(&server)).await.unwrap();
    let err = index.similarity_search(&[0.1], 5, "").await.unwrap_err();

    match err {
      SearchError::Index(message) => {
        assert!(message.contains("401"));
        assert!(message.contains("Invalid API Key"));
      }
      other => panic!("expected index error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_query_malformed_body_is_index_error() {
    let mut server = Server::new_async().await;
    let _mock =
      server.mock("POST", "/query").with_status(200).with_body("not json").create_async().await;

    let index = PineconeIndex::connect(options_for(&server)).await.unwrap();
    let err = index.similarity_search(&[0.1], 5, "").await.unwrap_err();
    assert_eq!(err.kind(), "index_failed");
  }

  #[tokio::test]
  async fn test_unreachable_host_is_index_error() {
    let options = PineconeOptions {
      index_host: Some("http://127.0.0.1:9".to_string()),
      timeout: Duration::from_secs(2),
      ..PineconeOptions::new(ApiKey::new("test-key"), "stocks")
    };

    let index = PineconeIndex::connect(options).await.unwrap();
    let err = index.similarity_search(&[0.1], 5, "").await.unwrap_err();
    assert!(err.to_string().contains("request to Pinecone"));
  }

  #[tokio::test]
  async fn test_describe_stats() {
    let mut server = Server::new_async().await;
    let body = json!({
      "namespaces": { "stock-descriptions": { "vectorCount": 5012 } },
      "dimension": 768,
      "indexFullness": 0.0,
      "totalVectorCount": 5012
    });
    let _mock = server
      .mock("POST", "/describe_index_stats")
      .with_status(200)
      .with_body(body.to_string())
      .create_async()
      .await;

    let index = PineconeIndex::connect(options_for(&server)).await.unwrap();
    let stats = index.describe_stats().await.unwrap();
    assert_eq!(stats.dimension, 768);
    assert_eq!(stats.total_vector_count, 5012);
    assert_eq!(stats.namespaces.get("stock-descriptions"), Some(&5012));
  }
}
