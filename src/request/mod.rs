//! Inbound reporting requests.
//!
//! A request arrives as a JSON object:
//!
//! ```json
//! {
//!   "scheduler": "nightly",
//!   "scheduleType": "DAILY_UPLOADS",
//!   "startDateTime": "2016-10-19T00:00:00Z",
//!   "endDateTime": "2016-10-19T23:59:59.999Z"
//! }
//! ```
//!
//! Parsing is pure; every failure is an [`AppError::BadRequest`] naming the
//! offending field.

mod kind;

pub use kind::ReportKind;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::chunker::TimeWindow;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    scheduler: String,
    #[serde(rename = "scheduleType")]
    kind: ReportKind,
    start_date_time: DateTime<FixedOffset>,
    end_date_time: DateTime<FixedOffset>,
}

/// Fields are kept untyped so a value of the wrong JSON type can be reported
/// against the field it arrived in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRequest {
    scheduler: Option<serde_json::Value>,
    schedule_type: Option<serde_json::Value>,
    start_date_time: Option<serde_json::Value>,
    end_date_time: Option<serde_json::Value>,
}

impl ReportRequest {
    pub fn new(
        scheduler: impl Into<String>,
        kind: ReportKind,
        start_date_time: DateTime<FixedOffset>,
        end_date_time: DateTime<FixedOffset>,
    ) -> AppResult<Self> {
        let scheduler: String = scheduler.into();
        let scheduler = scheduler.trim().to_string();
        if scheduler.is_empty() {
            return Err(AppError::BadRequest("scheduler must be specified.".into()));
        }
        if start_date_time > end_date_time {
            return Err(AppError::BadRequest(
                "startDateTime can't be after endDateTime.".into(),
            ));
        }

        Ok(Self {
            scheduler,
            kind,
            start_date_time,
            end_date_time,
        })
    }

    /// Parses and validates one inbound message body.
    pub fn parse(body: &serde_json::Value) -> AppResult<Self> {
        let raw: RawRequest = serde_json::from_value(body.clone())
            .map_err(|e| AppError::BadRequest(format!("Error parsing request: {e}")))?;

        let scheduler = string_field("scheduler", raw.scheduler)?
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("scheduler must be specified.".into()))?;

        let kind: ReportKind = string_field("scheduleType", raw.schedule_type)?
            .ok_or_else(|| AppError::BadRequest("scheduleType must be specified.".into()))?
            .parse()?;

        let start = parse_timestamp("startDateTime", raw.start_date_time)?;
        let end = parse_timestamp("endDateTime", raw.end_date_time)?;

        Self::new(scheduler, kind, start, end)
    }

    /// Same as [`ReportRequest::parse`] for a message that has not been decoded yet.
    pub fn parse_str(body: &str) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| AppError::BadRequest(format!("Error parsing request: {e}")))?;
        Self::parse(&value)
    }

    pub fn scheduler(&self) -> &str {
        &self.scheduler
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn start_date_time(&self) -> DateTime<FixedOffset> {
        self.start_date_time
    }

    pub fn end_date_time(&self) -> DateTime<FixedOffset> {
        self.end_date_time
    }

    pub fn report_id(&self) -> String {
        format!("{}{}", self.scheduler, self.kind.suffix())
    }

    /// Calendar date the report is filed under, in the request's own offset.
    pub fn report_date(&self) -> NaiveDate {
        self.start_date_time.date_naive()
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_date_time, self.end_date_time)
    }
}

/// A missing or `null` field is `None`; any non-string value is rejected.
fn string_field(field: &str, value: Option<serde_json::Value>) -> AppResult<Option<String>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(AppError::BadRequest(format!(
            "{field} must be a string, got {other}."
        ))),
    }
}

fn parse_timestamp(
    field: &str,
    value: Option<serde_json::Value>,
) -> AppResult<DateTime<FixedOffset>> {
    let value = string_field(field, value)?
        .ok_or_else(|| AppError::BadRequest(format!("{field} must be specified.")))?;
    DateTime::parse_from_rfc3339(value.trim()).map_err(|e| {
        AppError::BadRequest(format!(
            "{field} is not a valid ISO-8601 timestamp ({value}): {e}"
        ))
    })
}
