//! Observability hook for the query pipeline

use crate::error::SearchError;
use crate::logs::SearchLogs;

const COMPONENT: &str = "search-pipeline";

/// Called by the pipeline at fixed points of every non-empty search
pub trait SearchObserver: Send + Sync {
  fn on_start(&self, query: &str);

  fn on_success(&self, query: &str, match_count: usize);

  fn on_failure(&self, query: &str, error: &SearchError);
}

impl SearchObserver for SearchLogs {
  fn on_start(&self, query: &str) {
    self.info(&format!("Searching for {query:?}"), COMPONENT);
  }

  fn on_success(&self, query: &str, match_count: usize) {
    self.success(&format!("Found {match_count} matches for {query:?}"), COMPONENT);
  }

  fn on_failure(&self, query: &str, error: &SearchError) {
    self.error(&format!("Search for {query:?} failed [{}]: {error}", error.kind()), COMPONENT);
  }
}
