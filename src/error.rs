use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or semantically invalid reporting request. Never retried.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The platform rejected the session token.
    #[error("Session expired: {0}")]
    AuthExpired(String),

    #[error("Remote call failed: {0}")]
    RemoteCall(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether redelivering the same message could produce a different outcome.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AppError::BadRequest(_))
    }

    /// Short label used for the `error.type` span attribute and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::AuthExpired(_) => "auth_expired",
            AppError::RemoteCall(_) => "remote_call",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::RemoteCall(err.to_string())
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::AuthExpired(msg) | AppError::RemoteCall(msg) => {
                tracing::error!(error = %msg, error.type = self.kind(), "Platform error");
                (StatusCode::BAD_GATEWAY, "Platform call failed".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "error": error_message,
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "error": error_message,
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
