use super::{Report, ReportData, ReportGenerator, count_labels};
use crate::chunker::day_windows;
use crate::error::AppResult;
use crate::platform::{PlatformClient, TenantSummary};
use crate::request::ReportRequest;

/// Upload counts per upload status, for daily and weekly upload reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadsReportGenerator;

#[async_trait::async_trait]
impl ReportGenerator for UploadsReportGenerator {
    #[tracing::instrument(
        name = "report_generator uploads",
        skip_all,
        fields(
            tenant_id = %tenant.id,
            report.kind = %request.kind(),
            report.windows,
            report.uploads,
        )
    )]
    async fn generate(
        &self,
        client: &PlatformClient,
        request: &ReportRequest,
        tenant: &TenantSummary,
    ) -> AppResult<Report> {
        let mut uploads = Vec::new();
        let mut windows = 0usize;

        for window in day_windows(request.window()) {
            uploads.extend(client.list_uploads(&tenant.id, window).await?);
            windows += 1;
        }

        let counts = count_labels(uploads.iter().map(|u| u.status.as_str()));

        let span = tracing::Span::current();
        span.record("report.windows", windows);
        span.record("report.uploads", uploads.len());

        Ok(Report::for_request(request, tenant, ReportData::Counts(counts)))
    }

    fn name(&self) -> &'static str {
        "uploads"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PagingConfig;
    use crate::platform::fake::{Call, FakePlatform};
    use crate::reports::Counts;
    use crate::request::ReportKind;
    use chrono::{DateTime, NaiveDate};
    use std::sync::Arc;
    use std::time::Duration;

    fn client(fake: &Arc<FakePlatform>) -> PlatformClient {
        PlatformClient::new(
            fake.clone(),
            FakePlatform::credentials(),
            PagingConfig {
                page_delay: Duration::ZERO,
                ..PagingConfig::default()
            },
        )
    }

    fn request(kind: ReportKind, start: &str, end: &str) -> ReportRequest {
        ReportRequest::new(
            "test-scheduler",
            kind,
            DateTime::parse_from_rfc3339(start).unwrap(),
            DateTime::parse_from_rfc3339(end).unwrap(),
        )
        .unwrap()
    }

    fn tenant(id: &str) -> TenantSummary {
        TenantSummary {
            id: id.to_string(),
            display_name: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_counts_by_status() {
        let fake = Arc::new(FakePlatform::new());
        fake.add_uploads(
            "api",
            "2016-10-19T08:00:00Z",
            &["succeeded", "succeeded", "requested"],
        );

        let request = request(
            ReportKind::DailyUploads,
            "2016-10-19T00:00:00Z",
            "2016-10-19T23:59:59.999Z",
        );
        let report = UploadsReportGenerator
            .generate(&client(&fake), &request, &tenant("api"))
            .await
            .unwrap();

        assert_eq!(report.tenant_id, "api");
        assert_eq!(report.report_id, "test-scheduler-daily-upload-report");
        assert_eq!(report.date, NaiveDate::from_ymd_opt(2016, 10, 19).unwrap());
        assert_eq!(
            report.data,
            ReportData::Counts(Counts::from([
                ("succeeded".to_string(), 2),
                ("requested".to_string(), 1),
            ]))
        );
    }

    #[tokio::test]
    async fn test_no_uploads_gives_empty_counts() {
        let fake = Arc::new(FakePlatform::new());
        let request = request(
            ReportKind::DailyUploads,
            "2016-10-19T00:00:00Z",
            "2016-10-19T23:59:59.999Z",
        );
        let report = UploadsReportGenerator
            .generate(&client(&fake), &request, &tenant("api"))
            .await
            .unwrap();
        assert_eq!(report.data, ReportData::Counts(Counts::new()));
    }

    #[tokio::test]
    async fn test_weekly_queries_one_window_per_day() {
        let fake = Arc::new(FakePlatform::new());
        fake.add_uploads("api", "2016-10-16T12:00:00Z", &["succeeded"]);
        fake.add_uploads("api", "2016-10-18T12:00:00Z", &["succeeded", "failed"]);
        fake.add_uploads("api", "2016-10-22T23:59:59.999Z", &["duplicate"]);
        fake.add_uploads("api", "2016-10-23T00:00:00.001Z", &["out_of_range"]);

        let request = request(
            ReportKind::WeeklyUploads,
            "2016-10-16T00:00:00Z",
            "2016-10-23T00:00:00Z",
        );
        let report = UploadsReportGenerator
            .generate(&client(&fake), &request, &tenant("api"))
            .await
            .unwrap();

        assert_eq!(fake.count(|c| matches!(c, Call::ListUploads { .. })), 7);
        assert_eq!(report.report_id, "test-scheduler-weekly-upload-report");
        assert_eq!(
            report.data,
            ReportData::Counts(Counts::from([
                ("succeeded".to_string(), 2),
                ("failed".to_string(), 1),
                ("duplicate".to_string(), 1),
            ]))
        );
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let fake = Arc::new(FakePlatform::new());
        fake.fail_uploads_for("api");
        let request = request(
            ReportKind::DailyUploads,
            "2016-10-19T00:00:00Z",
            "2016-10-19T23:59:59.999Z",
        );
        let result = UploadsReportGenerator
            .generate(&client(&fake), &request, &tenant("api"))
            .await;
        assert!(result.is_err());
    }
}
