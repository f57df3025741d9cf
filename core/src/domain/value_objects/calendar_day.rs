//! Local calendar day used to scope daily counters

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

/// Step used to walk past a DST gap
const GAP_STEP_MINUTES: i64 = 15;

/// A local calendar date
///
/// Day-scoped keys embed [`CalendarDay::stamp`] and expire at
/// [`CalendarDay::next_midnight`], so daily state rolls over through the
/// store's own expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// The local calendar day containing `instant`
    pub fn of(instant: &DateTime<Local>) -> Self {
        Self(instant.date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Date stamp in `YYYYMMDD` form
    pub fn stamp(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// First instant of the following local day
    pub fn next_midnight(&self) -> DateTime<Local> {
        let next_day = self.0.succ_opt().unwrap_or(NaiveDate::MAX);
        let midnight = NaiveDateTime::new(next_day, NaiveTime::default());
        first_valid_instant(midnight, |naive| naive.and_local_timezone(Local))
            // No valid local time for a whole day after midnight
            .unwrap_or_else(|| Local.from_utc_datetime(&midnight) + Duration::days(1))
    }

    /// Whole seconds from `now` until the next local midnight, at least 1
    pub fn seconds_until_next_midnight(&self, now: &DateTime<Local>) -> u64 {
        let remaining = (self.next_midnight() - *now).num_seconds();
        u64::try_from(remaining).unwrap_or(0).max(1)
    }
}

/// Earliest instant at or after `start` that exists on the local clock
///
/// Midnight may fall inside a DST gap, in which case the day starts at the
/// first wall-clock time after the jump.
fn first_valid_instant<T>(
    start: NaiveDateTime,
    resolve: impl Fn(&NaiveDateTime) -> LocalResult<T>,
) -> Option<T> {
    (0..=24 * 60 / GAP_STEP_MINUTES)
        .map(|step| start + Duration::minutes(step * GAP_STEP_MINUTES))
        .find_map(|candidate| resolve(&candidate).earliest())
}
