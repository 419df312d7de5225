//! Calendar windows for cancellation budgets
//!
//! Day starts at local midnight, week starts Monday 00:00 local. These
//! boundaries are fixed policy.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// Trailing window for rates in per-user stats
pub const TRAILING_RATE_DAYS: i64 = 30;

/// Window boundaries evaluated at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindows {
    pub now: DateTime<Utc>,
    pub day_start: DateTime<Utc>,
    pub week_start: DateTime<Utc>,
    pub month_start: DateTime<Utc>,
    pub trailing_start: DateTime<Utc>,
}

impl CalendarWindows {
    /// Windows for the current instant in the process-local timezone
    pub fn current() -> Self {
        Self::at(&Local::now())
    }

    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let week_first = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let month_first = today.with_day(1).unwrap_or(today);
        let now_utc = now.with_timezone(&Utc);

        Self {
            now: now_utc,
            day_start: local_midnight(&tz, today),
            week_start: local_midnight(&tz, week_first),
            month_start: local_midnight(&tz, month_first),
            trailing_start: now_utc - Duration::days(TRAILING_RATE_DAYS),
        }
    }
}

/// Midnight of `date` in `tz`, as UTC.
///
/// When midnight does not exist locally (DST gap) the UTC midnight is used.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Minutes between two instants, never negative
pub fn elapsed_minutes(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let millis = (to - from).num_milliseconds().max(0);
    millis as f64 / 60_000.0
}
