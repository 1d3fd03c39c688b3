#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;

use rental_availability::adapters::memory::{Inventory, MemoryStore};
use rental_availability::config::types::BookingConfig;
use rental_availability::domain::resource::{
    BlockRecord, BookingRecord, BookingStatus, Resource, ResourceId, SeasonalRow, UnitType,
};
use rental_availability::ports::clock::Clock;
use rental_availability::services::availability::AvailabilityService;

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn id(s: &str) -> ResourceId {
    ResourceId::parse(s).unwrap()
}

pub fn resource(resource_id: &str, unit_type: UnitType, stock: i64) -> Resource {
    Resource {
        id: id(resource_id),
        name: format!("Resource {resource_id}"),
        unit_type,
        stock,
        active: true,
        base_price: 100.0,
        seasonal_prices: Vec::new(),
        min_units: None,
    }
}

pub fn booking(resource_id: &str, start: &str, end: &str, quantity: u32) -> BookingRecord {
    BookingRecord {
        resource: Some(id(resource_id)),
        start_date: Some(start.into()),
        end_date: Some(end.into()),
        quantity: Some(quantity),
        status: BookingStatus::Confirmed,
    }
}

pub fn block(resource_id: &str, from: &str, to: &str, quantity: u32) -> BlockRecord {
    BlockRecord {
        resource: Some(id(resource_id)),
        date_from: Some(from.into()),
        date_to: Some(to.into()),
        quantity: Some(quantity),
        active: true,
    }
}

pub fn season(name: &str, from: &str, to: &str, price: f64, min_units: Option<u32>) -> SeasonalRow {
    SeasonalRow {
        name: name.into(),
        date_from: Some(from.into()),
        date_to: Some(to.into()),
        price_per_unit: price,
        min_units,
    }
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub fn service_over(store: Arc<MemoryStore>, today: &str) -> AvailabilityService {
    AvailabilityService::from_store(
        store,
        Arc::new(FixedClock(day(today))),
        BookingConfig::default(),
    )
}

pub fn service_with(inventory: Inventory, today: &str) -> AvailabilityService {
    service_over(Arc::new(MemoryStore::new(inventory)), today)
}
