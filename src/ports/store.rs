use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::resource::{BlockRecord, BookingRecord, Resource, ResourceId};
use crate::error::Result;

/// Rentable resources. Only active resources are returned.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>>;

    /// One round-trip for any number of ids. Unknown or inactive ids are
    /// simply absent from the result.
    async fn get_resources(&self, ids: &[ResourceId]) -> Result<Vec<Resource>>;
}

/// Bookings in an occupying status whose `[start, end)` overlaps
/// `[from, to_exclusive)`.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn occupying_bookings(
        &self,
        resource_ids: &[ResourceId],
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<BookingRecord>>;
}

/// Active manual blocks whose `[from, to)` overlaps `[from, to_exclusive)`.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn active_blocks(
        &self,
        resource_ids: &[ResourceId],
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<BlockRecord>>;
}
