use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::dates::parse_iso_date_only;
use crate::domain::resource::{
    BlockRecord, BookingRecord, BookingStatus, Resource, ResourceId, SeasonalRow, UnitType,
};
use crate::error::{RentalError, Result};
use crate::ports::clock::Clock;
use crate::ports::store::{BlockStore, BookingStore, ResourceStore};

pub fn day(s: &str) -> NaiveDate {
    parse_iso_date_only(s).unwrap_or_else(|| panic!("bad test date {s}"))
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

pub fn booking(
    resource_id: &str,
    start: &str,
    end: &str,
    quantity: u32,
    status: BookingStatus,
) -> BookingRecord {
    BookingRecord {
        resource: Some(id(resource_id)),
        start_date: Some(start.into()),
        end_date: Some(end.into()),
        quantity: Some(quantity),
        status,
    }
}

pub fn block(resource_id: &str, from: &str, to: &str, quantity: u32, active: bool) -> BlockRecord {
    BlockRecord {
        resource: Some(id(resource_id)),
        date_from: Some(from.into()),
        date_to: Some(to.into()),
        quantity: Some(quantity),
        active,
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

/// Store whose every call fails like an unreachable backend.
pub struct FailingStore;

fn unreachable_store() -> RentalError {
    RentalError::Store {
        reason: "backend unreachable".into(),
    }
}

#[async_trait]
impl ResourceStore for FailingStore {
    async fn get_resource(&self, _id: &ResourceId) -> Result<Option<Resource>> {
        Err(unreachable_store())
    }

    async fn get_resources(&self, _ids: &[ResourceId]) -> Result<Vec<Resource>> {
        Err(unreachable_store())
    }
}

#[async_trait]
impl BookingStore for FailingStore {
    async fn occupying_bookings(
        &self,
        _resource_ids: &[ResourceId],
        _from: NaiveDate,
        _to_exclusive: NaiveDate,
    ) -> Result<Vec<BookingRecord>> {
        Err(unreachable_store())
    }
}

#[async_trait]
impl BlockStore for FailingStore {
    async fn active_blocks(
        &self,
        _resource_ids: &[ResourceId],
        _from: NaiveDate,
        _to_exclusive: NaiveDate,
    ) -> Result<Vec<BlockRecord>> {
        Err(unreachable_store())
    }
}
