use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::sync::Mutex;

use super::{
    ParticipantQuery, ParticipantRecord, PlatformApi, Session, TenantSummary, UploadQuery,
    UploadRecord,
};
use crate::chunker::TimeWindow;
use crate::config::WorkerCredentials;
use crate::error::{AppError, AppResult};
use crate::reports::Report;
use crate::telemetry::metrics::{
    PLATFORM_CALLS, PLATFORM_ERRORS, PLATFORM_PAGES_FETCHED, PLATFORM_REAUTHENTICATIONS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingConfig {
    pub upload_page_size: u32,
    pub participant_page_size: u32,
    /// Pause between two consecutive page requests of one listing.
    pub page_delay: Duration,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            upload_page_size: 10,
            participant_page_size: 100,
            page_delay: Duration::from_secs(1),
        }
    }
}

/// Session-aware, paginating access to the platform.
///
/// Every remote request goes through [`PlatformClient::call`]: it is tried
/// once, and if the platform reports the session as expired the client signs
/// in again exactly once and repeats the request exactly once more.
pub struct PlatformClient {
    api: Arc<dyn PlatformApi>,
    credentials: WorkerCredentials,
    paging: PagingConfig,
    session: Mutex<Option<Session>>,
}

impl PlatformClient {
    pub fn new(api: Arc<dyn PlatformApi>, credentials: WorkerCredentials, paging: PagingConfig) -> Self {
        Self {
            api,
            credentials,
            paging,
            session: Mutex::new(None),
        }
    }

    pub fn paging(&self) -> &PagingConfig {
        &self.paging
    }

    /// Returns the live session, signing in on first use.
    async fn current_session(&self) -> AppResult<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.sign_in().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Replaces `stale` with a fresh session. If another caller already
    /// replaced it, that newer session is reused instead of signing in again.
    async fn refresh_session(&self, stale: &Session) -> AppResult<Session> {
        let mut guard = self.session.lock().await;
        if let Some(current) = guard.as_ref()
            && current != stale
        {
            return Ok(current.clone());
        }

        *guard = None;
        let session = self.sign_in().await?;
        PLATFORM_REAUTHENTICATIONS.add(1, &[]);
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn sign_in(&self) -> AppResult<Session> {
        tracing::info!(
            platform = self.api.name(),
            tenant_scope = %self.credentials.tenant_scope,
            "Signing in to platform"
        );
        self.api.sign_in(&self.credentials).await.map_err(|e| match e {
            AppError::AuthExpired(msg) => AppError::RemoteCall(format!("sign-in rejected: {msg}")),
            other => other,
        })
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, request: F) -> AppResult<T>
    where
        F: Fn(Session) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let op_kv = KeyValue::new("platform.operation", operation);
        PLATFORM_CALLS.add(1, &[op_kv.clone()]);

        let session = self.current_session().await?;
        let result = match request(session.clone()).await {
            Err(AppError::AuthExpired(msg)) => {
                tracing::warn!(
                    operation,
                    error = %msg,
                    "Platform session expired, signing in again"
                );
                let session = self.refresh_session(&session).await?;
                PLATFORM_CALLS.add(1, &[op_kv.clone()]);
                match request(session).await {
                    Err(AppError::AuthExpired(msg)) => Err(AppError::RemoteCall(format!(
                        "{operation}: session rejected again after signing in: {msg}"
                    ))),
                    other => other,
                }
            }
            other => other,
        };

        if let Err(ref e) = result {
            PLATFORM_ERRORS.add(1, &[op_kv, KeyValue::new("error.type", e.kind())]);
        }

        result
    }

    async fn throttle(&self) {
        if !self.paging.page_delay.is_zero() {
            tokio::time::sleep(self.paging.page_delay).await;
        }
    }

    #[tracing::instrument(name = "platform.list_tenants", skip(self), fields(tenants))]
    pub async fn list_tenants(&self) -> AppResult<Vec<TenantSummary>> {
        let tenants = self
            .call("list_tenants", |session| {
                let api = self.api.clone();
                async move { api.list_tenants(&session).await }
            })
            .await?;

        tracing::Span::current().record("tenants", tenants.len());
        Ok(tenants)
    }

    /// All uploads of `tenant_id` in `window`, following the offset key until
    /// the platform stops returning one.
    #[tracing::instrument(
        name = "platform.list_uploads",
        skip(self, window),
        fields(start = %window.start, end = %window.end, pages, records)
    )]
    pub async fn list_uploads(&self, tenant_id: &str, window: TimeWindow) -> AppResult<Vec<UploadRecord>> {
        let mut records = Vec::new();
        let mut offset_key: Option<String> = None;
        let mut pages = 0u32;

        loop {
            if pages > 0 {
                self.throttle().await;
            }

            let query = UploadQuery {
                tenant_id: tenant_id.to_string(),
                window,
                page_size: self.paging.upload_page_size,
                offset_key: offset_key.take(),
            };
            let page = self
                .call("list_uploads", |session| {
                    let api = self.api.clone();
                    let query = query.clone();
                    async move { api.list_uploads(&session, &query).await }
                })
                .await?;

            pages += 1;
            PLATFORM_PAGES_FETCHED.add(1, &[KeyValue::new("platform.operation", "list_uploads")]);

            records.extend(page.items.into_iter().map(|mut record| {
                if record.tenant_id.is_empty() {
                    record.tenant_id = tenant_id.to_string();
                }
                record
            }));

            match page.offset_key.filter(|key| !key.is_empty()) {
                Some(key) if query.offset_key.as_deref() == Some(key.as_str()) => {
                    return Err(AppError::RemoteCall(format!(
                        "list_uploads for {tenant_id}: platform returned offset key {key} again"
                    )));
                }
                Some(key) => offset_key = Some(key),
                None => break,
            }
        }

        let span = tracing::Span::current();
        span.record("pages", pages);
        span.record("records", records.len());
        Ok(records)
    }

    /// All participants of `tenant_id` created in `window`, with full detail.
    ///
    /// The summary listing lacks status and sharing scope, so each summary is
    /// followed by a detail request.
    #[tracing::instrument(
        name = "platform.list_participants",
        skip(self, window),
        fields(start = %window.start, end = %window.end, pages, records)
    )]
    pub async fn list_participants(
        &self,
        tenant_id: &str,
        window: TimeWindow,
    ) -> AppResult<Vec<ParticipantRecord>> {
        let page_size = self.paging.participant_page_size;
        let mut records = Vec::new();
        let mut offset_by = 0u32;
        let mut pages = 0u32;

        loop {
            if pages > 0 {
                self.throttle().await;
            }

            let query = ParticipantQuery {
                tenant_id: tenant_id.to_string(),
                window,
                offset_by,
                page_size,
            };
            let page = self
                .call("list_participant_summaries", |session| {
                    let api = self.api.clone();
                    let query = query.clone();
                    async move { api.list_participant_summaries(&session, &query).await }
                })
                .await?;

            pages += 1;
            PLATFORM_PAGES_FETCHED.add(
                1,
                &[KeyValue::new("platform.operation", "list_participant_summaries")],
            );

            let fetched = page.items.len() as u32;
            for summary in &page.items {
                let mut participant = self
                    .call("get_participant", |session| {
                        let api = self.api.clone();
                        let participant_id = summary.id.clone();
                        let tenant_id = tenant_id.to_string();
                        async move {
                            api.get_participant(&session, &tenant_id, &participant_id)
                                .await
                        }
                    })
                    .await?;
                if participant.tenant_id.is_empty() {
                    participant.tenant_id = tenant_id.to_string();
                }
                records.push(participant);
            }

            offset_by += fetched;
            let exhausted = match page.total {
                Some(total) => offset_by >= total,
                None => fetched < page_size,
            };
            if fetched == 0 || exhausted {
                break;
            }
        }

        let span = tracing::Span::current();
        span.record("pages", pages);
        span.record("records", records.len());
        Ok(records)
    }

    #[tracing::instrument(
        name = "platform.publish_report",
        skip(self, report),
        fields(tenant_id = %report.tenant_id, report_id = %report.report_id, date = %report.date)
    )]
    pub async fn publish_report(&self, report: &Report) -> AppResult<()> {
        self.call("save_report", |session| {
            let api = self.api.clone();
            async move { api.save_report(&session, report).await }
        })
        .await
    }
}
