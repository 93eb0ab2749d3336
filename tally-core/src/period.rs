//! Named reporting periods anchored at an evaluation instant.

use chrono::{DateTime, Days, Months, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::time::{local_start_of_day, resolve_local};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }

    /// Window ending at `now`. Calendar arithmetic happens in `now`'s zone.
    pub fn resolve<T: TimeZone>(self, now: &DateTime<T>) -> DateRange {
        let start = match self {
            Period::Day => local_start_of_day(now),
            Period::Week => days_back(now, 7),
            Period::Month => months_back(now, 1),
            Period::Year => months_back(now, 12),
        };

        DateRange {
            start: start.with_timezone(&Utc),
            end: now.with_timezone(&Utc),
        }
    }

    /// Resolve against the system clock as seen in `tz`.
    pub fn resolve_now<T: TimeZone>(self, tz: &T) -> DateRange {
        self.resolve(&Utc::now().with_timezone(tz))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            _ => Err(Error::UnknownPeriod(s.to_string())),
        }
    }
}

/// Free-function form of [`Period::resolve`].
pub fn resolve_period<T: TimeZone>(period: Period, now: &DateTime<T>) -> DateRange {
    period.resolve(now)
}

/// Inclusive `[start, end]` window in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

// Calendar arithmetic happens on the local wall clock, then maps back to
// an instant with `resolve_local` (DST gap -> first valid minute, overlap ->
// earlier instant). `fallback` only applies outside chrono's date range.
fn shift_back<T: TimeZone>(
    now: &DateTime<T>,
    shift: impl Fn(NaiveDateTime) -> Option<NaiveDateTime>,
    fallback: TimeDelta,
) -> DateTime<T> {
    shift(now.naive_local())
        .and_then(|local| resolve_local(&now.timezone(), local))
        .unwrap_or_else(|| {
            tracing::warn!(fallback_days = fallback.num_days(), "calendar shift out of range");
            now.clone() - fallback
        })
}

fn days_back<T: TimeZone>(now: &DateTime<T>, days: u64) -> DateTime<T> {
    shift_back(
        now,
        |local| local.checked_sub_days(Days::new(days)),
        TimeDelta::days(days as i64),
    )
}

// chrono clamps the day of month: 31 Mar - 1 month = 28/29 Feb.
fn months_back<T: TimeZone>(now: &DateTime<T>, months: u32) -> DateTime<T> {
    shift_back(
        now,
        |local| local.checked_sub_months(Months::new(months)),
        TimeDelta::days(30 * months as i64),
    )
}
