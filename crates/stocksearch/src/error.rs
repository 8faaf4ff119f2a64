//! Error kinds surfaced by the search pipeline

use thiserror::Error;

/// Every failure the pipeline can report to a user
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
  /// `PINECONE_API_KEY` is absent or empty
  #[error("Pinecone API key not found in environment variables")]
  MissingCredential,

  /// The embedding model or index client could not be constructed
  #[error("failed to initialize search clients: {0}")]
  ClientInit(String),

  /// Model inference failed for a query
  #[error("embedding failed: {0}")]
  Embedding(String),

  /// The remote index call failed (auth, network, quota, malformed request)
  #[error("index query failed: {0}")]
  Index(String),
}

impl SearchError {
  /// Stable key for logs and API error envelopes
  pub fn kind(&self) -> &'static str {
    match self {
      SearchError::MissingCredential => "missing_credential",
      SearchError::ClientInit(_) => "client_init_failed",
      SearchError::Embedding(_) => "embedding_failed",
      SearchError::Index(_) => "index_failed",
    }
  }

  /// Whether this error disables search for the whole process rather than one query
  pub fn disables_search(&self) -> bool {
    matches!(self, SearchError::MissingCredential | SearchError::ClientInit(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_credential_display() {
    let err = SearchError::MissingCredential;
    assert_eq!(err.to_string(), "Pinecone API key not found in environment variables");
  }

  #[test]
  fn test_index_error_carries_message() {
    let err = SearchError::Index("401 Unauthorized".to_string());
    assert_eq!(err.to_string(), "index query failed: 401 Unauthorized");
  }

  #[test]
  fn test_kinds_are_distinct() {
    let kinds = [
      SearchError::MissingCredential.kind(),
      SearchError::ClientInit(String::new()).kind(),
      SearchError::Embedding(String::new()).kind(),
      SearchError::Index(String::new()).kind(),
    ];
    for (i, a) in kinds.iter().enumerate() {
      for b in &kinds[i + 1..] {
        assert_ne!(a, b);
      }
    }
  }

  #[test]
  fn test_only_startup_errors_disable_search() {
    assert!(SearchError::MissingCredential.disables_search());
    assert!(SearchError::ClientInit("model".to_string()).disables_search());
    assert!(!SearchError::Embedding("oom".to_string()).disables_search());
    assert!(!SearchError::Index("timeout".to_string()).disables_search());
  }
}
