//! UTC day-granularity date helpers.
//!
//! Every day in this crate is a `NaiveDate` interpreted as a UTC calendar
//! day. Ranges are half-open `[start, end)` unless stated otherwise.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Truncate an instant to UTC midnight.
pub fn start_of_day_utc(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(instant, |midnight| midnight.and_utc())
}

/// Calendar-day arithmetic. Saturates at the representable date bounds.
pub fn add_days_utc(date: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days >= 0 {
            NaiveDate::MAX
        } else {
            NaiveDate::MIN
        })
}

/// Days of `[start, end)` in order. Empty when `end <= start`.
pub fn iter_days(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day < end)
}

/// ISO strings for every day of `[start, end)`.
pub fn expand_days(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    iter_days(start, end).map(format_iso_date).collect()
}

/// Number of whole days in `[start, end)`, zero for empty or inverted ranges.
pub fn count_days(start: NaiveDate, end: NaiveDate) -> u32 {
    u32::try_from((end - start).num_days().max(0)).unwrap_or(u32::MAX)
}

/// Half-open interval intersection: touching intervals do not overlap.
pub fn overlaps<T: PartialOrd>(start_a: T, end_a: T, start_b: T, end_b: T) -> bool {
    start_a < end_b && end_a > start_b
}

/// Strict `YYYY-MM-DD` parse. Anything else (unpadded fields, time
/// components, surrounding whitespace) yields `None`.
pub fn parse_iso_date_only(input: &str) -> Option<NaiveDate> {
    let bytes = input.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(input, ISO_DATE_FORMAT).ok()
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(s: &str) -> NaiveDate {
        parse_iso_date_only(s).unwrap()
    }

    #[test]
    fn start_of_day_truncates_time() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 58).unwrap();
        let midnight = start_of_day_utc(instant);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap());
    }

    #[test]
    fn add_days_crosses_dst_and_month_boundaries() {
        // Last Sunday of March: DST switch in Europe, irrelevant in UTC.
        assert_eq!(add_days_utc(d("2024-03-30"), 2), d("2024-04-01"));
        assert_eq!(add_days_utc(d("2024-02-28"), 1), d("2024-02-29"));
        assert_eq!(add_days_utc(d("2024-01-01"), -1), d("2023-12-31"));
    }

    #[test]
    fn add_days_saturates() {
        assert_eq!(add_days_utc(NaiveDate::MAX, 1), NaiveDate::MAX);
        assert_eq!(add_days_utc(NaiveDate::MIN, -1), NaiveDate::MIN);
    }

    #[test]
    fn expand_days_is_end_exclusive() {
        assert_eq!(
            expand_days(d("2024-06-01"), d("2024-06-04")),
            vec!["2024-06-01", "2024-06-02", "2024-06-03"]
        );
    }

    #[test]
    fn expand_days_empty_when_inverted() {
        assert!(expand_days(d("2024-06-04"), d("2024-06-04")).is_empty());
        assert!(expand_days(d("2024-06-05"), d("2024-06-01")).is_empty());
    }

    #[test]
    fn count_days_never_negative() {
        assert_eq!(count_days(d("2024-06-01"), d("2024-06-05")), 4);
        assert_eq!(count_days(d("2024-06-05"), d("2024-06-01")), 0);
    }

    #[test]
    fn overlaps_half_open() {
        let (a1, a2) = (d("2024-06-01"), d("2024-06-05"));
        // touching
        assert!(!overlaps(a1, a2, d("2024-06-05"), d("2024-06-08")));
        assert!(overlaps(a1, a2, d("2024-06-04"), d("2024-06-08")));
        assert!(overlaps(a1, a2, d("2024-05-01"), d("2024-07-01")));
        assert!(!overlaps(a1, a2, d("2024-05-01"), d("2024-06-01")));
    }

    #[test]
    fn parse_accepts_strict_form_only() {
        assert_eq!(
            parse_iso_date_only("2024-06-01"),
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
        assert!(parse_iso_date_only("2024-6-01").is_none());
        assert!(parse_iso_date_only("2024-06-1").is_none());
        assert!(parse_iso_date_only(" 2024-06-01").is_none());
        assert!(parse_iso_date_only("2024-06-01T00:00:00Z").is_none());
        assert!(parse_iso_date_only("2024/06/01").is_none());
        assert!(parse_iso_date_only("2024-02-30").is_none());
        assert!(parse_iso_date_only("").is_none());
        assert!(parse_iso_date_only("+024-06-01").is_none());
    }

    #[test]
    fn format_roundtrips_through_parse() {
        let day = d("2028-12-31");
        assert_eq!(format_iso_date(day), "2028-12-31");
    }
}
