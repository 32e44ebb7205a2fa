//! Day-granularity interval arithmetic.
//!
//! Pure functions only. Everything operates on `NaiveDate`, so no comparison
//! here can be skewed by a time-of-day or a zone offset picked up during date
//! construction.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone};

use crate::{CalendarEvent, ModelError, ModelResult};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Number of days in `month_index` (0 = January) of `year`.
pub fn days_in_month(year: i32, month_index: u32) -> ModelResult<u32> {
    if month_index > 11 {
        return Err(ModelError::InvalidMonth(month_index));
    }
    let first =
        NaiveDate::from_ymd_opt(year, month_index + 1, 1).ok_or(ModelError::InvalidYear(year))?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or(ModelError::InvalidYear(year))?;
    Ok(next.signed_duration_since(first).num_days() as u32)
}

/// Order two days so the first is never after the second.
pub fn normalize_range(a: NaiveDate, b: NaiveDate) -> (NaiveDate, NaiveDate) {
    if a > b { (b, a) } else { (a, b) }
}

/// True iff `day` falls inside the event's inclusive `[start, end]` interval.
pub fn covers_day(event: &CalendarEvent, day: NaiveDate) -> bool {
    event.start <= day && day <= event.end
}

/// Inclusive day count of the event (a single-day event spans 1).
pub fn span_days(event: &CalendarEvent) -> i64 {
    event.end.signed_duration_since(event.start).num_days() + 1
}

/// Calendar day of a timestamp as seen in the timestamp's own zone.
///
/// Use this at the boundary whenever a host hands over a full timestamp; the
/// time-of-day is dropped, never rounded.
pub fn day_of<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> NaiveDate {
    timestamp.date_naive()
}

/// First and last day of `year`.
pub fn year_bounds(year: i32) -> ModelResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(ModelError::InvalidYear(year))?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(ModelError::InvalidYear(year))?;
    Ok((first, last))
}

/// True when the event's interval intersects `year` at all.
pub fn overlaps_year(event: &CalendarEvent, year: i32) -> bool {
    event.start.year() <= year && event.end.year() >= year
}

/// Calendar-only wire form (`YYYY-MM-DD`).
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse the wire form. A trailing time component (`2026-02-05T13:00:00Z`,
/// `2026-02-05 13:00`) is tolerated and discarded; only the leading calendar
/// date is read, so no zone conversion can move the day.
pub fn parse_day(raw: &str) -> ModelResult<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(['T', ' '])
        .next()
        .unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, DAY_FORMAT)
        .map_err(|_| ModelError::InvalidDate(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoryId, EventId};
    use chrono::{FixedOffset, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn event(start: NaiveDate, end: NaiveDate) -> CalendarEvent {
        CalendarEvent::new(
            EventId::from("e1"),
            "Trip",
            start,
            end,
            CategoryId::from("c1"),
        )
        .unwrap()
    }

    #[test]
    fn month_lengths_follow_leap_years() {
        assert_eq!(days_in_month(2026, 1).unwrap(), 28);
        assert_eq!(days_in_month(2024, 1).unwrap(), 29);
        assert_eq!(days_in_month(2026, 0).unwrap(), 31);
        assert_eq!(days_in_month(2026, 3).unwrap(), 30);
        assert_eq!(days_in_month(2026, 11).unwrap(), 31);
        assert_eq!(days_in_month(2026, 12), Err(ModelError::InvalidMonth(12)));
    }

    #[test]
    fn normalize_swaps_reversed_days() {
        let (a, b) = (d(2026, 3, 9), d(2026, 3, 2));
        assert_eq!(normalize_range(a, b), (b, a));
        assert_eq!(normalize_range(b, a), (b, a));
        assert_eq!(normalize_range(a, a), (a, a));
    }

    #[test]
    fn coverage_is_inclusive_on_both_ends() {
        let e = event(d(2026, 2, 5), d(2026, 2, 8));
        assert!(!covers_day(&e, d(2026, 2, 4)));
        assert!(covers_day(&e, d(2026, 2, 5)));
        assert!(covers_day(&e, d(2026, 2, 6)));
        assert!(covers_day(&e, d(2026, 2, 8)));
        assert!(!covers_day(&e, d(2026, 2, 9)));
        assert_eq!(span_days(&e), 4);
    }

    #[test]
    fn day_of_drops_time_in_the_stamps_zone() {
        let late_utc = Utc.with_ymd_and_hms(2026, 2, 8, 23, 59, 59).unwrap();
        assert_eq!(day_of(&late_utc), d(2026, 2, 8));
        // 2026-02-08 01:00 at +05:00 is still Feb 8 locally even though UTC is Feb 7.
        let offset = FixedOffset::east_opt(5 * 3600).unwrap();
        let early_local = offset.with_ymd_and_hms(2026, 2, 8, 1, 0, 0).unwrap();
        assert_eq!(day_of(&early_local), d(2026, 2, 8));
    }

    #[test]
    fn wire_format_round_trip_and_timestamp_tolerance() {
        assert_eq!(format_day(d(2026, 2, 5)), "2026-02-05");
        assert_eq!(parse_day("2026-02-05").unwrap(), d(2026, 2, 5));
        assert_eq!(parse_day("2026-02-05T23:30:00+02:00").unwrap(), d(2026, 2, 5));
        assert_eq!(parse_day(" 2026-02-05 00:00 ").unwrap(), d(2026, 2, 5));
        assert!(matches!(parse_day("05.02.2026"), Err(ModelError::InvalidDate(_))));
    }

    #[test]
    fn year_overlap_includes_straddling_events() {
        let straddle = event(d(2025, 12, 30), d(2026, 1, 2));
        assert!(overlaps_year(&straddle, 2025));
        assert!(overlaps_year(&straddle, 2026));
        assert!(!overlaps_year(&straddle, 2027));
        assert_eq!(year_bounds(2026).unwrap(), (d(2026, 1, 1), d(2026, 12, 31)));
    }
}
