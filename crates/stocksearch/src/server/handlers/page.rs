//! HTML search page handler

use axum::{
  extract::{Extension, Query, State},
  response::Html,
};

use crate::pipeline::{SearchAvailability, SearchOutcome};
use crate::presentation::{render_page, PageView};
use crate::server::{middleware::RequestContext, startup::AppState, types::PageQuery};

/// GET /?q=... - Render the search page, running the query when one is given
pub async fn search_page(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Query(params): Query<PageQuery>,
) -> Html<String> {
  let query = params.q.unwrap_or_default();

  let view = match state.search.as_ref() {
    SearchAvailability::Disabled(reason) => {
      if !query.trim().is_empty() {
        context.log_warn(&format!("Search disabled, ignoring query: {reason}"), "search-page");
      }
      PageView::disabled(&query, reason)
    }
    SearchAvailability::Ready(pipeline) => {
      let outcome = pipeline.run(&query).await;
      if let SearchOutcome::Failed(e) = &outcome {
        context.log_error(&format!("Rendering error banner: {e}"), "search-page");
      }
      PageView::from_outcome(&query, &outcome)
    }
  };

  Html(render_page(&view))
}
