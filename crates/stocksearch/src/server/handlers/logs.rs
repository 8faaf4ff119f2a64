//! Logs endpoint handler

use axum::{
  extract::{Query, State},
  response::Json,
};
use uuid::Uuid;

use crate::server::startup::AppState;
use crate::server::types::{BaseResponse, LogsQuery, LogsResponse};

const DEFAULT_LIMIT: usize = 100;

/// GET /logs - Most recent log entries, newest first
pub async fn get_logs(
  State(state): State<AppState>,
  Query(params): Query<LogsQuery>,
) -> Json<BaseResponse<LogsResponse>> {
  let transaction_id = Uuid::new_v4();
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT);

  let logs = state.logs.get_logs(Some(limit), params.level.as_deref());

  Json(BaseResponse::success(LogsResponse { logs }, transaction_id))
}
