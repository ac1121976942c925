//! Calendar helpers: `YearMonth`, monthly query windows in epoch seconds, and
//! epoch -> calendar day conversion. The reference timezone is UTC throughout.

use std::fmt;
use std::str::FromStr;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, Time};

// `YYYY-MM-DD` serde format for the `day` column of summary tables.
time::serde::format_description!(pub(crate) day_format, Date, "[year]-[month]-[day]");

/// Simple "YYYY-MM" utility with safe arithmetic and ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8, // 1..=12
}

/// Latest year for which the following month is still a representable date.
const MAX_YEAR: u16 = 9998;

impl YearMonth {
    pub fn new(year: u16, month: u8) -> Self {
        assert!((1..=12).contains(&month), "Month must be 1..=12");
        assert!((1..=MAX_YEAR).contains(&year), "Year must be 1..={MAX_YEAR}");
        Self { year, month }
    }

    /// The month containing "now" (UTC).
    pub fn current() -> Self {
        Self::containing(OffsetDateTime::now_utc().unix_timestamp())
    }

    /// The month containing the given epoch second.
    pub fn containing(ts: i64) -> Self {
        let date = day_of(ts);
        let year = date.year().clamp(1, MAX_YEAR as i32) as u16;
        Self { year, month: date.month() as u8 }
    }

    pub fn next(self) -> Option<Self> {
        if self.month < 12 {
            Some(Self { year: self.year, month: self.month + 1 })
        } else if self.year < MAX_YEAR {
            Some(Self { year: self.year + 1, month: 1 })
        } else {
            None
        }
    }

    fn first_day(self) -> Date {
        let month = Month::try_from(self.month).expect("YearMonth month is 1..=12");
        Date::from_calendar_date(self.year as i32, month, 1).expect("YearMonth year is within calendar range")
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.split('-').collect();
        if parts.len() != 2 {
            return Err("expected YYYY-MM".into());
        }
        let year: u16 = parts[0].parse().map_err(|_| "invalid year")?;
        let month: u8 = parts[1].parse().map_err(|_| "invalid month")?;
        if !(1..=12).contains(&month) {
            return Err("month must be 01..12".into());
        }
        if !(1..=MAX_YEAR).contains(&year) {
            return Err(format!("year must be 1..={MAX_YEAR}"));
        }
        Ok(Self { year, month })
    }
}

/// Inclusive iteration from `start` to `end` (if `start` <= `end`), else empty.
pub fn iter_year_months(start: YearMonth, end: YearMonth) -> impl Iterator<Item = YearMonth> {
    let mut curr = if start <= end { Some(start) } else { None };
    std::iter::from_fn(move || {
        let ret = curr?;
        curr = ret.next().filter(|n| *n <= end);
        Some(ret)
    })
}

/// Closed interval `[start, end]` of Unix epoch seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Query window for one calendar month.
///
/// `start` is midnight on the 1st. `end` is `reference_hour:59:59` on the last day
/// of the month, taken as the first day of the *next* month at that time minus one
/// day. Items created on the last day after that instant fall outside every window;
/// archives depend on this anchoring, so keep it as is.
pub fn month_window(ym: YearMonth, reference_hour: u8) -> TimeWindow {
    let start = ym.first_day().midnight().assume_utc().unix_timestamp();

    let next_first = match ym.next() {
        Some(n) => n.first_day(),
        // December of MAX_YEAR
        None => ym.first_day() + Duration::days(31),
    };
    let secs = reference_hour.min(23) as i64 * 3600 + 59 * 60 + 59;
    let anchor = Time::MIDNIGHT + Duration::seconds(secs);
    let end = (PrimitiveDateTime::new(next_first, anchor) - Duration::DAY)
        .assume_utc()
        .unix_timestamp();

    TimeWindow { start, end }
}

/// Calendar day (UTC) of an epoch second. Out-of-range values map to 1970-01-01
/// with a warning.
pub fn day_of(ts: i64) -> Date {
    match OffsetDateTime::from_unix_timestamp(ts) {
        Ok(dt) => dt.date(),
        Err(e) => {
            tracing::warn!("Timestamp {} is out of range ({}), bucketing it on 1970-01-01", ts, e);
            OffsetDateTime::UNIX_EPOCH.date()
        }
    }
}
