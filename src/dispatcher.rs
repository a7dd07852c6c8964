//! Entry point for one reporting request: parse it, enumerate tenants, and
//! generate and publish one report per tenant.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::platform::{PlatformClient, TenantSummary};
use crate::reports::{ReportGenerator, generator_for};
use crate::request::{ReportKind, ReportRequest};
use crate::telemetry::metrics::{
    REPORT_REQUEST_DURATION, REPORT_REQUESTS, REPORTS_PUBLISHED, TENANT_FAILURES,
};

/// What happens to the remaining tenants once one tenant fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TenantFailurePolicy {
    /// Abort the run at the first failing tenant.
    #[default]
    FailFast,
    /// Attempt every tenant, then fail the run if any tenant failed.
    Continue,
}

impl FromStr for TenantFailurePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_fast" => Ok(TenantFailurePolicy::FailFast),
            "continue" => Ok(TenantFailurePolicy::Continue),
            other => Err(AppError::Internal(format!(
                "unknown tenant failure policy: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Received,
    InProgress,
    Completed,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Received => "received",
            RunState::InProgress => "in_progress",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub run_id: Uuid,
    pub scheduler: String,
    pub report_kind: ReportKind,
    pub report_id: String,
    pub tenants_processed: usize,
    pub reports_published: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Default)]
struct Progress {
    tenants_processed: usize,
    reports_published: usize,
}

pub struct ReportDispatcher {
    client: Arc<PlatformClient>,
    policy: TenantFailurePolicy,
}

impl ReportDispatcher {
    pub fn new(client: Arc<PlatformClient>, policy: TenantFailurePolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> TenantFailurePolicy {
        self.policy
    }

    /// Handles one inbound message end to end.
    ///
    /// A message that does not parse fails with [`AppError::BadRequest`]
    /// before any remote call is made. Any other error is whatever stopped
    /// the run.
    pub async fn dispatch(&self, body: &serde_json::Value) -> AppResult<DispatchSummary> {
        self.run(Uuid::new_v4(), body).await
    }

    #[tracing::instrument(
        name = "dispatcher run",
        skip(self, body),
        fields(
            run.state = %RunState::Received,
            scheduler,
            report_kind,
            report_id,
            start,
            end,
            elapsed_ms,
        )
    )]
    async fn run(&self, run_id: Uuid, body: &serde_json::Value) -> AppResult<DispatchSummary> {
        let started = Instant::now();
        let span = tracing::Span::current();

        let request = match ReportRequest::parse(body) {
            Ok(request) => request,
            Err(e) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                span.record("run.state", RunState::Failed.as_str());
                span.record("elapsed_ms", elapsed_ms);
                record_outcome("bad_request", None, started);
                tracing::warn!(
                    %run_id,
                    scheduler = raw_field(body, "scheduler"),
                    report_kind = raw_field(body, "scheduleType"),
                    start = raw_field(body, "startDateTime"),
                    end = raw_field(body, "endDateTime"),
                    error = %e,
                    elapsed_ms,
                    "Rejected reporting request"
                );
                return Err(e);
            }
        };

        let kind = request.kind();
        let report_id = request.report_id();
        span.record("run.state", RunState::InProgress.as_str());
        span.record("scheduler", request.scheduler());
        span.record("report_kind", kind.as_str());
        span.record("report_id", report_id.as_str());
        span.record("start", request.start_date_time().to_rfc3339().as_str());
        span.record("end", request.end_date_time().to_rfc3339().as_str());

        let mut progress = Progress::default();
        let result = self.process(&request, &mut progress).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        span.record("elapsed_ms", elapsed_ms);

        match result {
            Ok(()) => {
                span.record("run.state", RunState::Completed.as_str());
                record_outcome("completed", Some(kind), started);
                tracing::info!(
                    %run_id,
                    scheduler = request.scheduler(),
                    report_kind = %kind,
                    start = %request.start_date_time(),
                    end = %request.end_date_time(),
                    tenants = progress.tenants_processed,
                    reports_published = progress.reports_published,
                    elapsed_ms,
                    "Reporting request completed"
                );

                Ok(DispatchSummary {
                    run_id,
                    scheduler: request.scheduler().to_string(),
                    report_kind: kind,
                    report_id,
                    tenants_processed: progress.tenants_processed,
                    reports_published: progress.reports_published,
                    elapsed_ms,
                })
            }
            Err(e) => {
                span.record("run.state", RunState::Failed.as_str());
                record_outcome("failed", Some(kind), started);
                tracing::error!(
                    %run_id,
                    scheduler = request.scheduler(),
                    report_kind = %kind,
                    start = %request.start_date_time(),
                    end = %request.end_date_time(),
                    tenants = progress.tenants_processed,
                    reports_published = progress.reports_published,
                    error = %e,
                    error.type = e.kind(),
                    elapsed_ms,
                    "Reporting request failed"
                );
                Err(e)
            }
        }
    }

    async fn process(&self, request: &ReportRequest, progress: &mut Progress) -> AppResult<()> {
        let tenants = self.client.list_tenants().await?;
        let generator = generator_for(request.kind());
        let mut failures = Vec::new();

        for tenant in &tenants {
            progress.tenants_processed += 1;

            match self.process_tenant(generator, request, tenant).await {
                Ok(()) => progress.reports_published += 1,
                Err(e) => {
                    TENANT_FAILURES.add(
                        1,
                        &[
                            KeyValue::new("report.kind", request.kind().as_str()),
                            KeyValue::new("error.type", e.kind()),
                        ],
                    );
                    tracing::warn!(
                        tenant_id = %tenant.id,
                        generator = generator.name(),
                        error = %e,
                        "Tenant report failed"
                    );

                    match self.policy {
                        TenantFailurePolicy::FailFast => return Err(e),
                        TenantFailurePolicy::Continue => failures.push(format!("{}: {e}", tenant.id)),
                    }
                }
            }
        }

        if !failures.is_empty() {
            return Err(AppError::RemoteCall(format!(
                "{} of {} tenants failed: {}",
                failures.len(),
                tenants.len(),
                failures.join("; ")
            )));
        }
        Ok(())
    }

    async fn process_tenant(
        &self,
        generator: &dyn ReportGenerator,
        request: &ReportRequest,
        tenant: &TenantSummary,
    ) -> AppResult<()> {
        let report = generator.generate(&self.client, request, tenant).await?;
        self.client.publish_report(&report).await?;

        REPORTS_PUBLISHED.add(1, &[KeyValue::new("report.kind", request.kind().as_str())]);
        tracing::info!(
            tenant_id = %report.tenant_id,
            report_id = %report.report_id,
            date = %report.date,
            data = %serde_json::to_string(&report.data).unwrap_or_default(),
            "Saved report"
        );
        Ok(())
    }
}

/// Best-effort string field of a message that failed to parse.
fn raw_field<'a>(body: &'a serde_json::Value, key: &str) -> &'a str {
    body.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn record_outcome(outcome: &'static str, kind: Option<ReportKind>, started: Instant) {
    let mut attrs = vec![KeyValue::new("outcome", outcome)];
    if let Some(kind) = kind {
        attrs.push(KeyValue::new("report.kind", kind.as_str()));
    }
    REPORT_REQUESTS.add(1, &attrs);
    REPORT_REQUEST_DURATION.record(started.elapsed().as_secs_f64(), &attrs);
}
