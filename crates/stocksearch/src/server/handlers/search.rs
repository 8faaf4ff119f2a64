//! JSON search endpoint handler

use axum::{
  extract::{Extension, Json, State},
  http::StatusCode,
  response::Json as ResponseJson,
};
use uuid::Uuid;

use crate::error::SearchError;
use crate::pipeline::SearchAvailability;
use crate::server::{
  middleware::RequestContext,
  startup::AppState,
  types::{ApiError, BaseResponse, SearchRequest, SearchResponse},
};

type ErrorResponse = (StatusCode, ResponseJson<BaseResponse<()>>);

/// POST /search - Run a natural-language stock search
pub async fn search_stocks(
  State(state): State<AppState>,
  Extension(context): Extension<RequestContext>,
  Json(request): Json<SearchRequest>,
) -> Result<ResponseJson<BaseResponse<SearchResponse>>, ErrorResponse> {
  let transaction_id = Uuid::new_v4();

  let pipeline = match state.search.as_ref() {
    SearchAvailability::Ready(pipeline) => pipeline,
    SearchAvailability::Disabled(reason) => {
      context.log_warn(&format!("Search requested while disabled: {reason}"), "search-api");
      return Err(error_response(reason, transaction_id));
    }
  };

  match pipeline.search(&request.query).await {
    Ok(result) => {
      context.log_success(&format!("Returned {} results", result.len()), "search-api");
      Ok(ResponseJson(BaseResponse::success(SearchResponse::from(&result), transaction_id)))
    }
    Err(e) => {
      context.log_error(&format!("Search failed: {e}"), "search-api");
      Err(error_response(&e, transaction_id))
    }
  }
}

pub fn status_for(error: &SearchError) -> StatusCode {
  match error {
    SearchError::MissingCredential | SearchError::ClientInit(_) => StatusCode::SERVICE_UNAVAILABLE,
    SearchError::Embedding(_) => StatusCode::INTERNAL_SERVER_ERROR,
    SearchError::Index(_) => StatusCode::BAD_GATEWAY,
  }
}

fn error_response(error: &SearchError, transaction_id: Uuid) -> ErrorResponse {
  (
    status_for(error),
    ResponseJson(BaseResponse::<()>::error(vec![ApiError::from(error)], transaction_id)),
  )
}
