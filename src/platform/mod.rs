//! Access to the remote research-data platform.
//!
//! [`PlatformApi`] is the raw capability set the platform exposes, one method
//! per remote request. [`PlatformClient`] wraps it with the session lifecycle
//! and pagination so report generators only ever see whole result sets.

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod http;

pub use client::{PagingConfig, PlatformClient};
pub use http::HttpPlatformApi;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::chunker::TimeWindow;
use crate::config::WorkerCredentials;
use crate::error::AppResult;
use crate::reports::Report;

/// Authenticated handle returned by sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSummary {
    #[serde(rename = "identifier")]
    pub id: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub status: String,
    #[serde(rename = "requestedOn", default)]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(rename = "studyId", default)]
    pub tenant_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPage {
    #[serde(default)]
    pub items: Vec<UploadRecord>,
    #[serde(alias = "nextPageOffsetKey", default)]
    pub offset_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountSummary {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummaryPage {
    #[serde(default)]
    pub items: Vec<AccountSummary>,
    #[serde(default)]
    pub total: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    #[serde(rename = "status")]
    pub account_status: String,
    #[serde(default)]
    pub sharing_scope: Option<String>,
    #[serde(rename = "studyId", default)]
    pub tenant_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadQuery {
    pub tenant_id: String,
    pub window: TimeWindow,
    pub page_size: u32,
    pub offset_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantQuery {
    pub tenant_id: String,
    pub window: TimeWindow,
    pub offset_by: u32,
    pub page_size: u32,
}

/// One method per remote request. Implementations report an expired or
/// rejected session as [`crate::error::AppError::AuthExpired`] and every other
/// failure as [`crate::error::AppError::RemoteCall`]; they never retry.
#[async_trait::async_trait]
pub trait PlatformApi: Send + Sync {
    async fn sign_in(&self, credentials: &WorkerCredentials) -> AppResult<Session>;

    async fn list_tenants(&self, session: &Session) -> AppResult<Vec<TenantSummary>>;

    async fn list_uploads(&self, session: &Session, query: &UploadQuery) -> AppResult<UploadPage>;

    async fn list_participant_summaries(
        &self,
        session: &Session,
        query: &ParticipantQuery,
    ) -> AppResult<AccountSummaryPage>;

    async fn get_participant(
        &self,
        session: &Session,
        tenant_id: &str,
        participant_id: &str,
    ) -> AppResult<ParticipantRecord>;

    async fn save_report(&self, session: &Session, report: &Report) -> AppResult<()>;

    fn name(&self) -> &str;
}
