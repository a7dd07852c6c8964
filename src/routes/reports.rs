use axum::{Json, extract::State};

use crate::AppState;
use crate::dispatcher::DispatchSummary;
use crate::error::{AppError, AppResult};

/// Runs one reporting request synchronously. The body is the same JSON
/// message the scheduler would enqueue.
pub async fn run_report(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, axum::extract::rejection::JsonRejection>,
) -> AppResult<Json<DispatchSummary>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(format!("Error parsing request: {e}")))?;

    let summary = state.dispatcher.dispatch(&body).await?;
    Ok(Json(summary))
}
