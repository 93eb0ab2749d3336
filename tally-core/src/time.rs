//! Time utilities: timezone parsing and local calendar boundaries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Parse an IANA timezone name like "America/Sao_Paulo".
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse()
        .map_err(|_| Error::InvalidTimezone(name.to_string()))
}

/// Parse "2026-02-20" (local midnight) or "2026-02-20 18:30" in `tz`,
/// returning UTC.
pub fn parse_local_datetime(local: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let trimmed = local.trim();
    let ndt = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M")
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|e| Error::InvalidDateTime {
            input: local.to_string(),
            reason: e.to_string(),
        })?;

    let local_dt = tz
        .from_local_datetime(&ndt)
        .single()
        .ok_or_else(|| Error::InvalidDateTime {
            input: local.to_string(),
            reason: format!("ambiguous or nonexistent local time in {tz}"),
        })?;

    Ok(local_dt.with_timezone(&Utc))
}

// Longest stretch of skipped wall-clock time searched for a valid minute.
const GAP_SEARCH_MINUTES: i64 = 26 * 60;

/// Map a wall-clock time in `tz` to an instant.
///
/// Ambiguous times (clocks falling back) take the earlier instant. Times
/// inside a DST gap move forward to the first minute that exists.
pub fn resolve_local<T: TimeZone>(tz: &T, local: NaiveDateTime) -> Option<DateTime<T>> {
    if let Some(dt) = tz.from_local_datetime(&local).earliest() {
        return Some(dt);
    }

    let minute = local.with_second(0)?.with_nanosecond(0)?;
    (1..=GAP_SEARCH_MINUTES)
        .map(|m| minute + TimeDelta::minutes(m))
        .find_map(|candidate| tz.from_local_datetime(&candidate).earliest())
}

/// First instant of `now`'s local calendar day.
///
/// When local midnight does not exist (DST starting at 00:00), this is the
/// first wall-clock minute that does.
pub fn local_start_of_day<T: TimeZone>(now: &DateTime<T>) -> DateTime<T> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    resolve_local(&now.timezone(), midnight).unwrap_or_else(|| now.clone())
}

/// Calendar day of a UTC instant as seen in `tz`.
pub fn local_date(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sao_paulo_datetime() {
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        let utc = parse_local_datetime("2026-02-20 23:59", &tz).unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-02-21T02:59:00+00:00");
    }

    #[test]
    fn test_parse_date_only_is_local_midnight() {
        let tz = parse_timezone("America/Chicago").unwrap();
        // Feb is CST (UTC-6)
        let utc = parse_local_datetime("2026-02-20", &tz).unwrap();
        assert_eq!(utc.to_rfc3339(), "2026-02-20T06:00:00+00:00");
    }

    #[test]
    fn test_rejects_garbage_and_bad_zone() {
        let tz = parse_timezone("UTC").unwrap();
        assert!(matches!(
            parse_local_datetime("20/02/2026", &tz),
            Err(Error::InvalidDateTime { .. })
        ));
        assert_eq!(
            parse_timezone("Mars/Olympus"),
            Err(Error::InvalidTimezone("Mars/Olympus".to_string()))
        );
    }

    #[test]
    fn test_start_of_day_regular() {
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        let now = tz.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap();
        let start = local_start_of_day(&now);
        assert_eq!(
            start.with_timezone(&Utc).to_rfc3339(),
            "2026-10-19T03:00:00+00:00"
        );
    }

    #[test]
    fn test_start_of_day_skips_missing_midnight() {
        // Brazil's 2018 DST started at 00:00 on Nov 4; local midnight never happened.
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        let now = tz.with_ymd_and_hms(2018, 11, 4, 12, 0, 0).unwrap();
        let start = local_start_of_day(&now);
        assert_eq!(
            start.with_timezone(&Utc).to_rfc3339(),
            "2018-11-04T03:00:00+00:00"
        );
    }

    #[test]
    fn test_resolve_local_gap_moves_to_first_valid_minute() {
        // Chicago springs forward 2026-03-08 02:00 -> 03:00
        let tz = parse_timezone("America/Chicago").unwrap();
        let in_gap = NaiveDate::from_ymd_opt(2026, 3, 8)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let dt = resolve_local(&tz, in_gap).unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-03-08T03:00:00-05:00");
    }

    #[test]
    fn test_resolve_local_ambiguous_takes_earlier() {
        // Chicago falls back 2026-11-01 02:00 -> 01:00
        let tz = parse_timezone("America/Chicago").unwrap();
        let twice = NaiveDate::from_ymd_opt(2026, 11, 1)
            .unwrap()
            .and_hms_opt(1, 30, 0)
            .unwrap();
        let dt = resolve_local(&tz, twice).unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-11-01T01:30:00-05:00");
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let tz = parse_timezone("America/Sao_Paulo").unwrap();
        let instant = Utc.with_ymd_and_hms(2026, 3, 1, 1, 0, 0).unwrap();
        assert_eq!(
            local_date(&instant, &tz),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }
}
