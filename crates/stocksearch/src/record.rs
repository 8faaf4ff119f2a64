//! Stock records as shown to users
//!
//! Stored metadata is sparse and inconsistent across loads, so every field is
//! defaulted independently. Nothing downstream ever sees an empty value.

use serde::Serialize;

use crate::index::Match;

/// Placeholder for any field missing from the stored metadata
pub const NOT_AVAILABLE: &str = "N/A";

pub const NAME_KEY: &str = "Name";
pub const TICKER_KEY: &str = "Ticker";
pub const INDUSTRY_KEY: &str = "Industry";
pub const SECTOR_KEY: &str = "Sector";
pub const CITY_KEY: &str = "City";
pub const STATE_KEY: &str = "State";
pub const COUNTRY_KEY: &str = "Country";
pub const SUMMARY_KEY: &str = "Business Summary";

#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct StockRecord {
  pub ticker: String,
  pub name: String,
  pub industry: String,
  pub sector: String,
  pub city: String,
  pub state: String,
  pub country: String,
  pub summary: String,
}

impl StockRecord {
  pub fn from_match(m: &Match) -> Self {
    let field = |key: &str| {
      m.metadata
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
    };

    // Prefer the stored document text, then the metadata copy of the summary
    let summary = m
      .content
      .as_deref()
      .map(str::trim)
      .filter(|text| !text.is_empty())
      .map(str::to_string)
      .unwrap_or_else(|| field(SUMMARY_KEY));

    Self {
      ticker: field(TICKER_KEY),
      name: field(NAME_KEY),
      industry: field(INDUSTRY_KEY),
      sector: field(SECTOR_KEY),
      city: field(CITY_KEY),
      state: field(STATE_KEY),
      country: field(COUNTRY_KEY),
      summary,
    }
  }

  /// "City, State, Country" with each part already defaulted
  pub fn location(&self) -> String {
    format!("{}, {}, {}", self.city, self.state, self.country)
  }
}
