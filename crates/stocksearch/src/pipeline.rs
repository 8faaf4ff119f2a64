//! Query pipeline: validate, embed, search, normalize
//!
//! The embedder and index handles are built once by the hosting layer and
//! passed in. `run` is the boundary that turns every failure into an outcome
//! the presentation layer can show.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, DEFAULT_INDEX_TIMEOUT, DEFAULT_NAMESPACE, DEFAULT_TOP_K};
use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::index::{IndexStats, VectorIndex};
use crate::observer::SearchObserver;
use crate::record::StockRecord;

#[derive(Debug, Clone)]
pub struct SearchSettings {
  pub top_k: usize,
  pub namespace: String,
  pub index_timeout: Duration,
}

impl Default for SearchSettings {
  fn default() -> Self {
    Self {
      top_k: DEFAULT_TOP_K,
      namespace: DEFAULT_NAMESPACE.to_string(),
      index_timeout: DEFAULT_INDEX_TIMEOUT,
    }
  }
}

impl From<&Config> for SearchSettings {
  fn from(config: &Config) -> Self {
    Self {
      top_k: config.top_k.max(1),
      namespace: config.namespace.clone(),
      index_timeout: config.index_timeout,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockHit {
  pub record: StockRecord,
  /// Opaque ranking key from the index
  pub score: f32,
}

/// Ranked hits for one query, best first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
  pub query: String,
  pub hits: Vec<StockHit>,
}

impl QueryResult {
  pub fn empty(query: &str) -> Self {
    Self { query: query.to_string(), hits: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.hits.is_empty()
  }

  pub fn len(&self) -> usize {
    self.hits.len()
  }
}

/// What a single submitted query produced
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
  /// Nothing to search for
  Skipped,
  /// The search ran; zero hits is still a success
  Found(QueryResult),
  Failed(SearchError),
}

pub struct SearchPipeline {
  embedder: Arc<dyn Embedder>,
  index: Arc<dyn VectorIndex>,
  observer: Arc<dyn SearchObserver>,
  settings: SearchSettings,
}

impl SearchPipeline {
  pub fn new(
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    observer: Arc<dyn SearchObserver>,
    settings: SearchSettings,
  ) -> Self {
    Self { embedder, index, observer, settings }
  }

  pub fn settings(&self) -> &SearchSettings {
    &self.settings
  }

  pub fn model_name(&self) -> &str {
    self.embedder.model_name()
  }

  /// Search for `raw_query`. A blank query returns an empty result without
  /// touching the embedder or the index.
  pub async fn search(&self, raw_query: &str) -> Result<QueryResult, SearchError> {
    let query = raw_query.trim();
    if query.is_empty() {
      return Ok(QueryResult::empty(query));
    }

    self.observer.on_start(query);

    let result = self.execute(query).await;
    match &result {
      Ok(found) => self.observer.on_success(query, found.len()),
      Err(e) => self.observer.on_failure(query, e),
    }
    result
  }

  /// Like [`search`](Self::search), but never fails
  pub async fn run(&self, raw_query: &str) -> SearchOutcome {
    if raw_query.trim().is_empty() {
      return SearchOutcome::Skipped;
    }

    match self.search(raw_query).await {
      Ok(found) => SearchOutcome::Found(found),
      Err(e) => SearchOutcome::Failed(e),
    }
  }

  /// Index statistics, bounded by the same timeout as queries
  pub async fn index_stats(&self) -> Result<IndexStats, SearchError> {
    tokio::time::timeout(self.settings.index_timeout, self.index.describe_stats())
      .await
      .map_err(|_| self.timeout_error())?
  }

  async fn execute(&self, query: &str) -> Result<QueryResult, SearchError> {
    let vector = self.embedder.embed_query(query).await?;
    let k = self.settings.top_k;

    let matches = tokio::time::timeout(
      self.settings.index_timeout,
      self.index.similarity_search(&vector, k, &self.settings.namespace),
    )
    .await
    .map_err(|_| self.timeout_error())??;

    // Index order is the ranking contract; only bound the count
    let hits = matches
      .iter()
      .take(k)
      .map(|m| StockHit { record: StockRecord::from_match(m), score: m.score })
      .collect();

    Ok(QueryResult { query: query.to_string(), hits })
  }

  fn timeout_error(&self) -> SearchError {
    SearchError::Index(format!(
      "timed out after {}s waiting for the vector index",
      self.settings.index_timeout.as_secs_f32()
    ))
  }
}

/// Whether the process can serve searches at all.
///
/// Decided once at startup; a disabled service keeps its reason for the banner.
pub enum SearchAvailability {
  Ready(SearchPipeline),
  Disabled(SearchError),
}

impl SearchAvailability {
  pub fn pipeline(&self) -> Option<&SearchPipeline> {
    match self {
      SearchAvailability::Ready(pipeline) => Some(pipeline),
      SearchAvailability::Disabled(_) => None,
    }
  }

  pub fn disabled_reason(&self) -> Option<&SearchError> {
    match self {
      SearchAvailability::Ready(_) => None,
      SearchAvailability::Disabled(reason) => Some(reason),
    }
  }

  pub fn is_ready(&self) -> bool {
    matches!(self, SearchAvailability::Ready(_))
  }
}
