#![no_main]
use libfuzzer_sys::fuzz_target;
use rental_availability::domain::dates::{format_iso_date, parse_iso_date_only};
use rental_availability::domain::occupancy::QueryWindow;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Some(date) = parse_iso_date_only(text) {
            assert_eq!(format_iso_date(date), text);
        }
        let (from, to) = text.split_at(text.len() / 2);
        if let Some(window) = QueryWindow::parse_inclusive(from, to) {
            let _ = window.days().take(1000).count();
        }
    }
});
