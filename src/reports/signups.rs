use std::collections::BTreeMap;

use super::{Report, ReportData, ReportGenerator, count_labels};
use crate::error::AppResult;
use crate::platform::{PlatformClient, TenantSummary};
use crate::request::ReportRequest;

/// Account status that makes a participant's sharing scope worth counting.
const ENABLED_STATUS: &str = "enabled";

/// Sign-ups in the window broken down by account status, plus the sharing
/// scope of the enabled accounts among them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignUpsReportGenerator;

#[async_trait::async_trait]
impl ReportGenerator for SignUpsReportGenerator {
    #[tracing::instrument(
        name = "report_generator signups",
        skip_all,
        fields(tenant_id = %tenant.id, report.participants)
    )]
    async fn generate(
        &self,
        client: &PlatformClient,
        request: &ReportRequest,
        tenant: &TenantSummary,
    ) -> AppResult<Report> {
        let participants = client.list_participants(&tenant.id, request.window()).await?;
        tracing::Span::current().record("report.participants", participants.len());

        let by_status = count_labels(participants.iter().map(|p| p.account_status.as_str()));
        let by_sharing = count_labels(
            participants
                .iter()
                .filter(|p| p.account_status == ENABLED_STATUS)
                .filter_map(|p| p.sharing_scope.as_deref()),
        );

        let data = ReportData::Breakdown(BTreeMap::from([
            ("byStatus".to_string(), by_status),
            ("bySharing".to_string(), by_sharing),
        ]));
        Ok(Report::for_request(request, tenant, data))
    }

    fn name(&self) -> &'static str {
        "signups"
    }
}
