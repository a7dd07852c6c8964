use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The aggregation a scheduled request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportKind {
    DailyUploads,
    WeeklyUploads,
    DailySignups,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [
        ReportKind::DailyUploads,
        ReportKind::WeeklyUploads,
        ReportKind::DailySignups,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::DailyUploads => "DAILY_UPLOADS",
            ReportKind::WeeklyUploads => "WEEKLY_UPLOADS",
            ReportKind::DailySignups => "DAILY_SIGNUPS",
        }
    }

    pub fn is_upload_report(&self) -> bool {
        matches!(self, ReportKind::DailyUploads | ReportKind::WeeklyUploads)
    }

    /// Appended to the scheduler name to form the report identifier.
    ///
    /// Upload kinds keep their historical `-<period>-upload-report` ids;
    /// every other kind uses its lower-cased, hyphenated name.
    pub fn suffix(&self) -> String {
        if self.is_upload_report() {
            let period = self.as_str().trim_end_matches("_UPLOADS");
            format!("-{}-upload-report", period.to_lowercase())
        } else {
            format!("-{}-report", self.as_str().replace('_', "-").to_lowercase())
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DAILY_UPLOADS" | "DAILY" => Ok(ReportKind::DailyUploads),
            "WEEKLY_UPLOADS" | "WEEKLY" => Ok(ReportKind::WeeklyUploads),
            "DAILY_SIGNUPS" => Ok(ReportKind::DailySignups),
            other => Err(AppError::BadRequest(format!(
                "Invalid report schedule type: {other}"
            ))),
        }
    }
}
