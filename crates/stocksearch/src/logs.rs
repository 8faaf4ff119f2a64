//! Structured in-memory log buffer
//!
//! Keeps the most recent entries for the `/logs` endpoint and mirrors every
//! entry to `tracing` so the console and the buffer never disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_CAPACITY: usize = 1000;

/// Request context information for logs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LogContext {
  /// Request ID for correlation
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_agent: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<f64>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub status_code: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LogEntry {
  pub timestamp: DateTime<Utc>,
  pub level: String,
  pub message: String,
  pub component: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub context: Option<LogContext>,
}

struct SearchLogsInner {
  entries: VecDeque<LogEntry>,
  max_entries: usize,
}

/// Bounded, thread-safe log storage. Clones share the same buffer.
#[derive(Clone)]
pub struct SearchLogs {
  inner: Arc<Mutex<SearchLogsInner>>,
}

impl Default for SearchLogs {
  fn default() -> Self {
    Self::new(DEFAULT_CAPACITY)
  }
}

impl SearchLogs {
  pub fn new(max_entries: usize) -> Self {
    let max_entries = max_entries.max(1);
    Self {
      inner: Arc::new(Mutex::new(SearchLogsInner {
        entries: VecDeque::with_capacity(max_entries),
        max_entries,
      })),
    }
  }

  pub fn add_log(&self, level: &str, message: &str, component: &str) {
    self.add_log_with_context(level, message, component, None);
  }

  pub fn add_log_with_context(
    &self,
    level: &str,
    message: &str,
    component: &str,
    context: Option<LogContext>,
  ) {
    mirror_to_tracing(level, message, component);

    let mut inner = self.lock();
    if inner.entries.len() >= inner.max_entries {
      inner.entries.pop_front(); // Remove oldest
    }
    inner.entries.push_back(LogEntry {
      timestamp: Utc::now(),
      level: level.to_string(),
      message: message.to_string(),
      component: component.to_string(),
      context,
    });
  }

  pub fn info(&self, message: &str, component: &str) {
    self.add_log("info", message, component);
  }

  pub fn warn(&self, message: &str, component: &str) {
    self.add_log("warn", message, component);
  }

  pub fn error(&self, message: &str, component: &str) {
    self.add_log("error", message, component);
  }

  pub fn success(&self, message: &str, component: &str) {
    self.add_log("success", message, component);
  }

  /// Newest first, optionally filtered by level ("all" matches everything)
  pub fn get_logs(&self, limit: Option<usize>, level_filter: Option<&str>) -> Vec<LogEntry> {
    let inner = self.lock();
    let matching = inner
      .entries
      .iter()
      .rev()
      .filter(|entry| level_filter.map_or(true, |filter| filter == "all" || entry.level == filter))
      .cloned();

    match limit {
      Some(limit) => matching.take(limit).collect(),
      None => matching.collect(),
    }
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn max_capacity(&self) -> usize {
    self.lock().max_entries
  }

  /// A panic while logging must not hide the buffer from later readers
  fn lock(&self) -> MutexGuard<'_, SearchLogsInner> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

fn mirror_to_tracing(level: &str, message: &str, component: &str) {
  match level {
    "error" => tracing::error!(component, "{message}"),
    "warn" => tracing::warn!(component, "{message}"),
    "debug" => tracing::debug!(component, "{message}"),
    _ => tracing::info!(component, "{message}"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_add_and_get_newest_first() {
    let logs = SearchLogs::new(10);
    logs.info("first", "test");
    logs.warn("second", "test");
    logs.error("third", "test");

    let entries = logs.get_logs(None, None);
    let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["third", "second", "first"]);
  }

  #[test]
  fn test_capacity_evicts_oldest() {
    let logs = SearchLogs::new(2);
    logs.info("one", "test");
    logs.info("two", "test");
    logs.info("three", "test");

    assert_eq!(logs.len(), 2);
    assert_eq!(logs.max_capacity(), 2);
    let messages: Vec<String> = logs.get_logs(None, None).into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["three", "two"]);
  }

  #[test]
  fn test_level_filter_and_limit() {
    let logs = SearchLogs::new(10);
    logs.info("a", "test");
    logs.error("b", "test");
    logs.error("c", "test");
    logs.success("d", "test");

    assert_eq!(logs.get_logs(None, Some("error")).len(), 2);
    assert_eq!(logs.get_logs(None, Some("all")).len(), 4);
    assert_eq!(logs.get_logs(Some(1), Some("error"))[0].message, "c");
  }

  #[test]
  fn test_clones_share_buffer() {
    let logs = SearchLogs::new(10);
    let clone = logs.clone();
    clone.info("from clone", "test");
    assert_eq!(logs.len(), 1);
    assert!(!logs.is_empty());
  }

  #[test]
  fn test_poisoned_buffer_keeps_working() {
    let logs = SearchLogs::new(5);
    logs.info("before", "test");

    let inner = logs.inner.clone();
    let _ = std::thread::spawn(move || {
      let _guard = inner.lock().unwrap();
      panic!("poison the buffer");
    })
    .join();
    assert!(logs.inner.is_poisoned());

    assert_eq!(logs.len(), 1);
    assert_eq!(logs.max_capacity(), 5);
    logs.info("after", "test");
    assert_eq!(logs.get_logs(None, None)[0].message, "after");
    assert_eq!(logs.len(), 2);
  }

  #[test]
  fn test_context_serialization_skips_empty_fields() {
    let logs = SearchLogs::new(10);
    let context = LogContext {
      request_id: Some("abc".to_string()),
      status_code: Some(200),
      ..Default::default()
    };
    logs.add_log_with_context("info", "done", "http-request", Some(context));

    let json = serde_json::to_value(&logs.get_logs(None, None)[0]).unwrap();
    assert_eq!(json["context"]["request_id"], "abc");
    assert_eq!(json["context"]["status_code"], 200);
    assert!(json["context"].get("method").is_none());
  }
}
