pub mod chunker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod platform;
pub mod reports;
pub mod request;
pub mod routes;
pub mod telemetry;

pub use config::Config;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use dispatcher::ReportDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dispatcher: Arc<ReportDispatcher>,
}

/// API routes without the transport layers `main` adds around them.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/reports", post(routes::reports::run_report))
        .with_state(state)
}
