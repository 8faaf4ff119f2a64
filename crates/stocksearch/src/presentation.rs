//! HTML rendering of the search page
//!
//! Rendering is split in two: [`panels`] turns a [`QueryResult`] into display
//! strings, [`render_page`] lays out a whole [`PageView`]. Neither does I/O.

use crate::error::SearchError;
use crate::pipeline::{QueryResult, SearchOutcome};

pub const PAGE_TITLE: &str = "Stock Search";
pub const PAGE_SUBTITLE: &str = "Search for stocks using natural language queries";
pub const QUERY_PLACEHOLDER: &str = "e.g., tech companies focused on AI";
pub const NO_RESULTS_NOTICE: &str = "No matching stocks found.";

/// Opening tags of the two banners, as emitted into the page body
pub const ERROR_BANNER: &str = "<div class=\"banner banner-error\" role=\"alert\">";
pub const DISABLED_BANNER: &str = "<div class=\"banner banner-disabled\" role=\"alert\">";

/// One collapsible result, every field already formatted
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
  pub title: String,
  pub industry: String,
  pub sector: String,
  pub location: String,
  pub summary: String,
  pub score: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
  /// No query submitted yet
  Idle,
  Results(Vec<Panel>),
  NoResults,
  Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
  pub query: String,
  /// Set when search cannot run at all; shown on every page
  pub disabled: Option<String>,
  pub state: PageState,
}

impl PageView {
  pub fn from_outcome(query: &str, outcome: &SearchOutcome) -> Self {
    let state = match outcome {
      SearchOutcome::Skipped => PageState::Idle,
      SearchOutcome::Found(result) if result.is_empty() => PageState::NoResults,
      SearchOutcome::Found(result) => PageState::Results(panels(result)),
      SearchOutcome::Failed(error) => PageState::Error(failure_message(error)),
    };
    Self { query: query.to_string(), disabled: None, state }
  }

  pub fn disabled(query: &str, reason: &SearchError) -> Self {
    Self {
      query: query.to_string(),
      disabled: Some(format!("Search is unavailable: {reason}")),
      state: PageState::Idle,
    }
  }
}

pub fn failure_message(error: &SearchError) -> String {
  format!("Search failed: {error}")
}

pub fn panels(result: &QueryResult) -> Vec<Panel> {
  result
    .hits
    .iter()
    .map(|hit| {
      let record = &hit.record;
      Panel {
        title: format!("🏢 {} ({})", record.name, record.ticker),
        industry: record.industry.clone(),
        sector: record.sector.clone(),
        location: record.location(),
        summary: record.summary.clone(),
        score: format!("{:.3}", hit.score),
      }
    })
    .collect()
}

pub fn render_page(view: &PageView) -> String {
  let mut html = String::with_capacity(4096);

  html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
  html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
  html.push_str(&format!("<title>{PAGE_TITLE}</title>\n"));
  html.push_str(STYLE);
  html.push_str("</head>\n<body>\n<main>\n");
  html.push_str(&format!("<h1>{PAGE_TITLE}</h1>\n<p class=\"subtitle\">{PAGE_SUBTITLE}</p>\n"));

  if let Some(reason) = &view.disabled {
    html.push_str(&format!("{DISABLED_BANNER}{}</div>\n", escape_html(reason)));
  }

  let disabled_attr = if view.disabled.is_some() { " disabled" } else { "" };
  html.push_str(&format!(
    "<form method=\"get\" action=\"/\">\n\
     <input type=\"text\" name=\"q\" value=\"{}\" placeholder=\"{}\" aria-label=\"Search query\"{}>\n\
     </form>\n",
    escape_html(&view.query),
    escape_html(QUERY_PLACEHOLDER),
    disabled_attr
  ));

  match &view.state {
    PageState::Idle => {}
    PageState::NoResults => {
      html.push_str(&format!("<p class=\"notice\">{NO_RESULTS_NOTICE}</p>\n"));
    }
    PageState::Error(message) => {
      html.push_str(&format!("{ERROR_BANNER}{}</div>\n", escape_html(message)));
    }
    PageState::Results(panels) => {
      html.push_str("<section class=\"results\">\n");
      for panel in panels {
        render_panel(&mut html, panel);
      }
      html.push_str("</section>\n");
    }
  }

  html.push_str("</main>\n</body>\n</html>\n");
  html
}

fn render_panel(html: &mut String, panel: &Panel) {
  html.push_str("<details class=\"panel\">\n");
  html.push_str(&format!("<summary>{}</summary>\n", escape_html(&panel.title)));
  html.push_str("<div class=\"columns\">\n");
  html.push_str(&format!(
    "<div><p><strong>Industry:</strong> {}</p><p><strong>Sector:</strong> {}</p></div>\n",
    escape_html(&panel.industry),
    escape_html(&panel.sector)
  ));
  html.push_str(&format!(
    "<div><p><strong>Location:</strong> {}</p><p><strong>Score:</strong> {}</p></div>\n",
    escape_html(&panel.location),
    escape_html(&panel.score)
  ));
  html.push_str("</div>\n");
  html.push_str(&format!(
    "<p><strong>Business Summary:</strong></p>\n<p class=\"summary\">{}</p>\n",
    escape_html(&panel.summary)
  ));
  html.push_str("</details>\n");
}

pub fn escape_html(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      _ => escaped.push(c),
    }
  }
  escaped
}

const STYLE: &str = "<style>\n\
body { font-family: system-ui, sans-serif; margin: 0; background: #fafafa; color: #222; }\n\
main { max-width: 760px; margin: 0 auto; padding: 2rem 1rem; }\n\
.subtitle { color: #666; margin-top: -0.5rem; }\n\
input[name=q] { width: 100%; padding: 0.6rem; font-size: 1rem; box-sizing: border-box; }\n\
.banner { padding: 0.75rem 1rem; border-radius: 4px; margin: 1rem 0; }\n\
.banner-error { background: #fdecea; color: #8a1c1c; }\n\
.banner-disabled { background: #fff4e5; color: #7a4b00; }\n\
.notice { color: #555; }\n\
.panel { background: #fff; border: 1px solid #ddd; border-radius: 4px; margin: 0.75rem 0; padding: 0.5rem 1rem; }\n\
.panel summary { cursor: pointer; font-weight: 600; }\n\
.columns { display: flex; gap: 2rem; }\n\
.columns > div { flex: 1; }\n\
</style>\n";
