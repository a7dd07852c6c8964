//! Scripted in-memory platform used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::DateTime;

use super::{
    AccountSummary, AccountSummaryPage, ParticipantQuery, ParticipantRecord, PlatformApi, Session,
    TenantSummary, UploadPage, UploadQuery, UploadRecord,
};
use crate::chunker::TimeWindow;
use crate::config::WorkerCredentials;
use crate::error::{AppError, AppResult};
use crate::reports::Report;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    SignIn,
    ListTenants,
    ListUploads {
        tenant_id: String,
        window: TimeWindow,
        offset_key: Option<String>,
    },
    ListParticipantSummaries {
        tenant_id: String,
        offset_by: u32,
    },
    GetParticipant {
        tenant_id: String,
        participant_id: String,
    },
    SaveReport {
        tenant_id: String,
        report_id: String,
    },
}

#[derive(Default)]
struct State {
    tenants: Vec<TenantSummary>,
    uploads: HashMap<String, Vec<UploadRecord>>,
    participants: HashMap<String, Vec<(String, ParticipantRecord)>>,
    calls: Vec<Call>,
    published: Vec<Report>,
    sign_ins: u32,
    valid_token: Option<String>,
    reject_all_sessions: bool,
    reject_sign_in: bool,
    expire_after: Option<u32>,
    failing_uploads: HashSet<String>,
    failing_publish: HashSet<String>,
    repeating_offset_keys: HashSet<String>,
}

impl State {
    fn authorize(&mut self, session: &Session) -> AppResult<()> {
        if self.reject_all_sessions || self.valid_token.as_ref() != Some(&session.session_token) {
            return Err(AppError::AuthExpired("401 Unauthorized".to_string()));
        }

        if let Some(remaining) = self.expire_after {
            if remaining <= 1 {
                self.valid_token = None;
                self.expire_after = None;
            } else {
                self.expire_after = Some(remaining - 1);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credentials() -> WorkerCredentials {
        WorkerCredentials {
            tenant_scope: "api".to_string(),
            principal: "worker@example.org".to_string(),
            secret: "secret".to_string(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_tenant(&self, id: &str) {
        self.state().tenants.push(TenantSummary {
            id: id.to_string(),
            display_name: id.to_string(),
        });
    }

    pub fn add_uploads(&self, tenant_id: &str, timestamp: &str, statuses: &[&str]) {
        let timestamp = DateTime::parse_from_rfc3339(timestamp).unwrap();
        let mut state = self.state();
        let uploads = state.uploads.entry(tenant_id.to_string()).or_default();
        for status in statuses {
            uploads.push(UploadRecord {
                status: status.to_string(),
                timestamp: Some(timestamp),
                tenant_id: String::new(),
            });
        }
    }

    pub fn add_participant(&self, tenant_id: &str, status: &str, sharing_scope: Option<&str>) {
        let mut state = self.state();
        let participants = state.participants.entry(tenant_id.to_string()).or_default();
        let id = format!("p{}", participants.len() + 1);
        participants.push((
            id,
            ParticipantRecord {
                account_status: status.to_string(),
                sharing_scope: sharing_scope.map(str::to_string),
                tenant_id: String::new(),
            },
        ));
    }

    /// Invalidates the current session token.
    pub fn expire_session(&self) {
        self.state().valid_token = None;
    }

    /// Invalidates the session token once `calls` more requests succeeded.
    pub fn expire_session_after_calls(&self, calls: u32) {
        self.state().expire_after = Some(calls);
    }

    pub fn reject_all_sessions(&self) {
        self.state().reject_all_sessions = true;
    }

    pub fn reject_sign_in(&self) {
        self.state().reject_sign_in = true;
    }

    pub fn fail_uploads_for(&self, tenant_id: &str) {
        self.state().failing_uploads.insert(tenant_id.to_string());
    }

    /// Upload pages of `tenant_id` always point back at the same offset key.
    pub fn repeat_offset_key_for(&self, tenant_id: &str) {
        self.state()
            .repeating_offset_keys
            .insert(tenant_id.to_string());
    }

    pub fn fail_publish_for(&self, tenant_id: &str) {
        self.state().failing_publish.insert(tenant_id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn published(&self) -> Vec<Report> {
        self.state().published.clone()
    }

    pub fn sign_in_count(&self) -> u32 {
        self.state().sign_ins
    }
}

#[async_trait::async_trait]
impl PlatformApi for FakePlatform {
    async fn sign_in(&self, _credentials: &WorkerCredentials) -> AppResult<Session> {
        let mut state = self.state();
        state.calls.push(Call::SignIn);
        if state.reject_sign_in {
            return Err(AppError::AuthExpired("invalid credentials".to_string()));
        }

        state.sign_ins += 1;
        let token = format!("session-{}", state.sign_ins);
        state.valid_token = Some(token.clone());
        Ok(Session {
            session_token: token,
        })
    }

    async fn list_tenants(&self, session: &Session) -> AppResult<Vec<TenantSummary>> {
        // Lets concurrent callers interleave before the session is checked.
        tokio::task::yield_now().await;
        let mut state = self.state();
        state.calls.push(Call::ListTenants);
        state.authorize(session)?;
        Ok(state.tenants.clone())
    }

    async fn list_uploads(&self, session: &Session, query: &UploadQuery) -> AppResult<UploadPage> {
        let mut state = self.state();
        state.calls.push(Call::ListUploads {
            tenant_id: query.tenant_id.clone(),
            window: query.window,
            offset_key: query.offset_key.clone(),
        });
        state.authorize(session)?;
        if state.failing_uploads.contains(&query.tenant_id) {
            return Err(AppError::RemoteCall("503 Service Unavailable".to_string()));
        }

        let matching: Vec<UploadRecord> = state
            .uploads
            .get(&query.tenant_id)
            .map(|uploads| {
                uploads
                    .iter()
                    .filter(|u| {
                        u.timestamp.is_some_and(|t| {
                            t >= query.window.start && t <= query.window.end
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if state.repeating_offset_keys.contains(&query.tenant_id) {
            return Ok(UploadPage {
                items: matching,
                offset_key: Some("stuck".to_string()),
            });
        }

        let offset: usize = query
            .offset_key
            .as_deref()
            .map(|k| k.parse().unwrap())
            .unwrap_or(0);
        let next = offset + query.page_size as usize;
        Ok(UploadPage {
            items: matching
                .iter()
                .skip(offset)
                .take(query.page_size as usize)
                .cloned()
                .collect(),
            offset_key: (next < matching.len()).then(|| next.to_string()),
        })
    }

    async fn list_participant_summaries(
        &self,
        session: &Session,
        query: &ParticipantQuery,
    ) -> AppResult<AccountSummaryPage> {
        let mut state = self.state();
        state.calls.push(Call::ListParticipantSummaries {
            tenant_id: query.tenant_id.clone(),
            offset_by: query.offset_by,
        });
        state.authorize(session)?;

        let participants = state
            .participants
            .get(&query.tenant_id)
            .cloned()
            .unwrap_or_default();
        Ok(AccountSummaryPage {
            items: participants
                .iter()
                .skip(query.offset_by as usize)
                .take(query.page_size as usize)
                .map(|(id, _)| AccountSummary { id: id.clone() })
                .collect(),
            total: Some(participants.len() as u32),
        })
    }

    async fn get_participant(
        &self,
        session: &Session,
        tenant_id: &str,
        participant_id: &str,
    ) -> AppResult<ParticipantRecord> {
        let mut state = self.state();
        state.calls.push(Call::GetParticipant {
            tenant_id: tenant_id.to_string(),
            participant_id: participant_id.to_string(),
        });
        state.authorize(session)?;

        state
            .participants
            .get(tenant_id)
            .and_then(|ps| ps.iter().find(|(id, _)| id == participant_id))
            .map(|(_, p)| p.clone())
            .ok_or_else(|| AppError::RemoteCall(format!("404 participant {participant_id}")))
    }

    async fn save_report(&self, session: &Session, report: &Report) -> AppResult<()> {
        let mut state = self.state();
        state.calls.push(Call::SaveReport {
            tenant_id: report.tenant_id.clone(),
            report_id: report.report_id.clone(),
        });
        state.authorize(session)?;
        if state.failing_publish.contains(&report.tenant_id) {
            return Err(AppError::RemoteCall("500 Internal Server Error".to_string()));
        }

        state.published.push(report.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}
