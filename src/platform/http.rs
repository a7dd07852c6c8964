use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use reqwest::{StatusCode, Url};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    AccountSummaryPage, ParticipantQuery, ParticipantRecord, PlatformApi, Session, TenantSummary,
    UploadPage, UploadQuery,
};
use crate::config::WorkerCredentials;
use crate::error::{AppError, AppResult};
use crate::reports::{Report, ReportData};

const SESSION_HEADER: &str = "Bridge-Session";

/// [`PlatformApi`] over the platform's JSON REST interface.
pub struct HttpPlatformApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPlatformApi {
    pub fn new(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Internal(format!("invalid platform base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Internal(format!(
                "platform base URL cannot carry a path: {base_url}"
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Appends `segments` to the base URL, percent-encoding each one so ids
    /// containing `/`, `?` or `#` stay a single path segment.
    fn url(&self, segments: &[&str]) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::Internal(format!(
                    "platform base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn session_headers(session: &Session) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            SESSION_HEADER,
            HeaderValue::from_str(&session.session_token)
                .map_err(|e| AppError::Internal(format!("invalid session header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &Session,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let response = self
            .client
            .get(self.url(segments)?)
            .headers(Self::session_headers(session)?)
            .query(query)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct SignInBody<'a> {
    study: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Serialize)]
struct ReportBody<'a> {
    date: String,
    data: &'a ReportData,
}

/// Maps a non-success response to the error the client layer expects. A 401
/// means the session token is no longer accepted.
async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(AppError::AuthExpired(format!("{url}: {status}")));
    }
    Err(AppError::RemoteCall(format!("{url}: {status}: {body}")))
}

fn timestamp(value: DateTime<FixedOffset>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait::async_trait]
impl PlatformApi for HttpPlatformApi {
    async fn sign_in(&self, credentials: &WorkerCredentials) -> AppResult<Session> {
        let body = SignInBody {
            study: &credentials.tenant_scope,
            email: &credentials.principal,
            password: &credentials.secret,
        };

        let response = self
            .client
            .post(self.url(&["v3", "auth", "signIn"])?)
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn list_tenants(&self, session: &Session) -> AppResult<Vec<TenantSummary>> {
        let list: ItemList<TenantSummary> = self
            .get_json(
                session,
                &["v3", "studies"],
                &[("summary", "true".to_string())],
            )
            .await?;
        Ok(list.items)
    }

    async fn list_uploads(&self, session: &Session, query: &UploadQuery) -> AppResult<UploadPage> {
        let mut params = vec![
            ("startTime", timestamp(query.window.start)),
            ("endTime", timestamp(query.window.end)),
            ("pageSize", query.page_size.to_string()),
        ];
        if let Some(key) = &query.offset_key {
            params.push(("offsetKey", key.clone()));
        }

        self.get_json(
            session,
            &["v3", "studies", query.tenant_id.as_str(), "uploads"],
            &params,
        )
        .await
    }

    async fn list_participant_summaries(
        &self,
        session: &Session,
        query: &ParticipantQuery,
    ) -> AppResult<AccountSummaryPage> {
        let params = [
            ("offsetBy", query.offset_by.to_string()),
            ("pageSize", query.page_size.to_string()),
            ("startTime", timestamp(query.window.start)),
            ("endTime", timestamp(query.window.end)),
        ];

        self.get_json(
            session,
            &["v3", "studies", query.tenant_id.as_str(), "participants"],
            &params,
        )
        .await
    }

    async fn get_participant(
        &self,
        session: &Session,
        tenant_id: &str,
        participant_id: &str,
    ) -> AppResult<ParticipantRecord> {
        self.get_json(
            session,
            &["v3", "studies", tenant_id, "participants", participant_id],
            &[],
        )
        .await
    }

    async fn save_report(&self, session: &Session, report: &Report) -> AppResult<()> {
        let body = ReportBody {
            date: report.date.to_string(),
            data: &report.data,
        };

        let response = self
            .client
            .post(self.url(&[
                "v3",
                "studies",
                report.tenant_id.as_str(),
                "reports",
                report.report_id.as_str(),
            ])?)
            .headers(Self::session_headers(session)?)
            .json(&body)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
