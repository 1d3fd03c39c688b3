#![no_main]
use libfuzzer_sys::fuzz_target;
use rental_availability::adapters::memory::Inventory;
use rental_availability::domain::occupancy::{QueryWindow, compute_occupancy};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(inventory) = serde_yml::from_str::<Inventory>(text) else {
        return;
    };
    let Some(window) = QueryWindow::parse_inclusive("2024-06-01", "2024-06-30") else {
        return;
    };
    let Some(today) = chrono::NaiveDate::from_ymd_opt(2024, 5, 1) else {
        return;
    };
    for resource in &inventory.resources {
        let snapshot =
            compute_occupancy(resource, &window, &inventory.bookings, &inventory.blocks, today);
        for occ in snapshot.days.values() {
            assert!(occ.remaining <= snapshot.stock);
        }
    }
});
