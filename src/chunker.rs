//! Splits a reporting window into the single-day windows the upload listing
//! endpoint accepts.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::Serialize;

/// A window of time with both ends inclusive at millisecond granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Lazily yields day windows covering `window` in ascending order.
///
/// A window spanning at most one day is yielded unchanged. Longer windows are
/// cut into `[start + n days, start + (n + 1) days - 1ms]` pieces, the last
/// one clipped to the original end.
pub fn day_windows(window: TimeWindow) -> DayWindows {
    DayWindows {
        next_start: Some(window.start),
        end: window.end,
        single: window.span() <= TimeDelta::days(1),
    }
}

#[derive(Debug, Clone)]
pub struct DayWindows {
    next_start: Option<DateTime<FixedOffset>>,
    end: DateTime<FixedOffset>,
    single: bool,
}

impl Iterator for DayWindows {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_start.take()?;

        if self.single {
            return Some(TimeWindow::new(start, self.end));
        }

        if start >= self.end {
            return None;
        }

        let next_day = start + TimeDelta::days(1);
        let end = (next_day - TimeDelta::milliseconds(1)).min(self.end);
        if next_day < self.end {
            self.next_start = Some(next_day);
        }

        Some(TimeWindow::new(start, end))
    }
}
