//! Environment-driven configuration
//!
//! Loaded once at startup. Only the Pinecone credential is required; everything
//! else has a default matching the index the stock descriptions were loaded into.

use std::fmt;
use std::time::Duration;

use crate::error::SearchError;

pub const API_KEY_VAR: &str = "PINECONE_API_KEY";
pub const INDEX_NAME_VAR: &str = "PINECONE_INDEX";
pub const NAMESPACE_VAR: &str = "PINECONE_NAMESPACE";
pub const INDEX_HOST_VAR: &str = "PINECONE_INDEX_HOST";
pub const CONTROLLER_URL_VAR: &str = "PINECONE_CONTROLLER_URL";

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_INDEX_NAME: &str = "stocks";
/// Pinecone's default namespace, where the loader upserted the descriptions
pub const DEFAULT_NAMESPACE: &str = "";
pub const DEFAULT_CONTROLLER_URL: &str = "https://api.pinecone.io";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(10);

/// Pinecone API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  /// The raw secret, for request headers only
  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "ApiKey([redacted])")
  }
}

impl fmt::Display for ApiKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[redacted]")
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  pub api_key: ApiKey,
  /// Name of the Pinecone index holding the stock descriptions
  pub index_name: String,
  /// Namespace the descriptions were upserted into
  pub namespace: String,
  /// Data-plane host; resolved through the controller when absent
  pub index_host: Option<String>,
  pub controller_url: String,
  pub top_k: usize,
  pub index_timeout: Duration,
}

impl Config {
  /// Build a config from an arbitrary variable lookup
  pub fn from_lookup<F>(lookup: F) -> Result<Self, SearchError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    let api_key = non_empty(API_KEY_VAR).ok_or(SearchError::MissingCredential)?;

    Ok(Self {
      api_key: ApiKey::new(api_key.trim()),
      index_name: non_empty(INDEX_NAME_VAR).unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
      namespace: lookup(NAMESPACE_VAR).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
      index_host: non_empty(INDEX_HOST_VAR),
      controller_url: non_empty(CONTROLLER_URL_VAR)
        .unwrap_or_else(|| DEFAULT_CONTROLLER_URL.to_string()),
      top_k: DEFAULT_TOP_K,
      index_timeout: DEFAULT_INDEX_TIMEOUT,
    })
  }
}

/// Read the configuration from the process environment
pub fn load_config() -> Result<Config, SearchError> {
  Config::from_lookup(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> =
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| vars.get(key).cloned()
  }

  #[test]
  fn test_missing_key_is_missing_credential() {
    let result = Config::from_lookup(lookup_from(&[]));
    assert_eq!(result.unwrap_err(), SearchError::MissingCredential);
  }

  #[test]
  fn test_blank_key_is_missing_credential() {
    let result = Config::from_lookup(lookup_from(&[(API_KEY_VAR, "   ")]));
    assert_eq!(result.unwrap_err(), SearchError::MissingCredential);
  }

  #[test]
  fn test_defaults_applied() {
    let config = Config::from_lookup(lookup_from(&[(API_KEY_VAR, "pc-secret")])).unwrap();
    assert_eq!(config.api_key.expose(), "pc-secret");
    assert_eq!(config.index_name, "stocks");
    assert_eq!(config.namespace, "");
    assert_eq!(config.index_host, None);
    assert_eq!(config.controller_url, DEFAULT_CONTROLLER_URL);
    assert_eq!(config.top_k, 5);
    assert_eq!(config.index_timeout, Duration::from_secs(10));
  }

  #[test]
  fn test_overrides_applied() {
    let config = Config::from_lookup(lookup_from(&[
      (API_KEY_VAR, "pc-secret"),
      (INDEX_NAME_VAR, "equities"),
      (NAMESPACE_VAR, "stock-descriptions"),
      (INDEX_HOST_VAR, "equities-abc.svc.pinecone.io"),
    ]))
    .unwrap();
    assert_eq!(config.index_name, "equities");
    assert_eq!(config.namespace, "stock-descriptions");
    assert_eq!(config.index_host.as_deref(), Some("equities-abc.svc.pinecone.io"));
  }

  #[test]
  fn test_debug_never_shows_secret() {
    let config = Config::from_lookup(lookup_from(&[(API_KEY_VAR, "pc-very-secret")])).unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("pc-very-secret"));
    assert!(debug.contains("[redacted]"));
    assert_eq!(config.api_key.to_string(), "[redacted]");
  }
}
