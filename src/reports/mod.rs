pub mod signups;
pub mod uploads;

pub use signups::SignUpsReportGenerator;
pub use uploads::UploadsReportGenerator;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppResult;
use crate::platform::{PlatformClient, TenantSummary};
use crate::request::{ReportKind, ReportRequest};

/// Label -> occurrence count. Labels that never occur are absent.
pub type Counts = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReportData {
    Counts(Counts),
    Breakdown(BTreeMap<String, Counts>),
}

/// One tenant's report for one scheduled run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub tenant_id: String,
    pub report_id: String,
    pub date: NaiveDate,
    pub data: ReportData,
}

impl Report {
    pub fn for_request(request: &ReportRequest, tenant: &TenantSummary, data: ReportData) -> Self {
        Self {
            tenant_id: tenant.id.clone(),
            report_id: request.report_id(),
            date: request.report_date(),
            data,
        }
    }
}

/// Builds one tenant's report. Generators only read through the client; the
/// dispatcher publishes what they return.
#[async_trait::async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(
        &self,
        client: &PlatformClient,
        request: &ReportRequest,
        tenant: &TenantSummary,
    ) -> AppResult<Report>;

    fn name(&self) -> &'static str;
}

static UPLOADS_GENERATOR: UploadsReportGenerator = UploadsReportGenerator;
static SIGNUPS_GENERATOR: SignUpsReportGenerator = SignUpsReportGenerator;

pub fn generator_for(kind: ReportKind) -> &'static dyn ReportGenerator {
    match kind {
        ReportKind::DailyUploads | ReportKind::WeeklyUploads => &UPLOADS_GENERATOR,
        ReportKind::DailySignups => &SIGNUPS_GENERATOR,
    }
}

/// Counts occurrences of each label.
pub fn count_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Counts {
    let mut counts = Counts::new();
    for label in labels {
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    counts
}
