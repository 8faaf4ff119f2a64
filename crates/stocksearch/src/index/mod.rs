//! Vector index abstraction layer
//!
//! The pipeline only ever talks to [`VectorIndex`]. Pinecone is the production
//! backend; tests substitute their own implementations.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::SearchError;

pub mod pinecone;

pub use pinecone::{PineconeIndex, PineconeOptions};

/// One ranked hit returned by the index
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
  /// Vector id (the ticker for well-formed records)
  pub id: String,
  /// Similarity score, higher is more similar. Only meaningful as a ranking key.
  pub score: f32,
  /// Attached metadata, every value rendered as a string
  pub metadata: BTreeMap<String, String>,
  /// Stored free text, when the loader kept it alongside the vector
  pub content: Option<String>,
}

/// Summary of what the index holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, schemars::JsonSchema)]
pub struct IndexStats {
  pub dimension: usize,
  pub total_vector_count: u64,
  /// Vector count per namespace ("" is the default namespace)
  pub namespaces: BTreeMap<String, u64>,
}

/// Nearest-neighbour lookup against a stored collection of stock descriptions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
  /// Return up to `k` matches for `vector` in `namespace`, best first.
  /// Fewer matches, including none, is a successful result.
  async fn similarity_search(
    &self,
    vector: &[f32],
    k: usize,
    namespace: &str,
  ) -> Result<Vec<Match>, SearchError>;

  /// Report dimension and vector counts
  async fn describe_stats(&self) -> Result<IndexStats, SearchError>;
}
