#![no_main]
use libfuzzer_sys::fuzz_target;
use rental_availability::domain::occupancy::collect_demands;
use rental_availability::domain::resource::{BlockRecord, BookingRecord};

fuzz_target!(|data: &[u8]| {
    let Ok(docs) = serde_json::from_slice::<Vec<serde_json::Value>>(data) else {
        return;
    };
    let bookings: Vec<BookingRecord> = docs
        .iter()
        .filter_map(|doc| serde_json::from_value(doc.clone()).ok())
        .collect();
    let blocks: Vec<BlockRecord> = docs
        .iter()
        .filter_map(|doc| serde_json::from_value(doc.clone()).ok())
        .collect();
    for demand in collect_demands(&bookings, &blocks) {
        assert!(demand.start < demand.end);
        assert!(demand.quantity > 0);
    }
});
