use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::types::BookingConfig;
use crate::domain::booking::{BookingRequest, check_booking};
use crate::domain::dates::{overlaps, parse_iso_date_only};
use crate::domain::resource::{BlockRecord, BookingRecord, BookingStatus, Resource, ResourceId};
use crate::error::{RentalError, Result};
use crate::ports::store::{BlockStore, BookingStore, ResourceStore};

/// Everything the in-memory store holds; also the data file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub bookings: Vec<BookingRecord>,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

impl Inventory {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RentalError::Store {
            reason: format!("failed to read inventory {}: {e}", path.display()),
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let inventory: Self = serde_yml::from_str(&content)?;
        tracing::info!(
            resources = inventory.resources.len(),
            bookings = inventory.bookings.len(),
            blocks = inventory.blocks.len(),
            "inventory loaded from {}",
            path.display()
        );
        Ok(inventory)
    }
}

/// Rows whose dates cannot be read are passed through; the ledger decides
/// what to do with them.
fn may_overlap(start: Option<&str>, end: Option<&str>, from: NaiveDate, to: NaiveDate) -> bool {
    match (start.and_then(parse_iso_date_only), end.and_then(parse_iso_date_only)) {
        (Some(start), Some(end)) => overlaps(start, end, from, to),
        _ => true,
    }
}

fn belongs_to(resource: Option<&ResourceId>, ids: &[ResourceId]) -> bool {
    resource.is_some_and(|r| ids.contains(r))
}

pub struct MemoryStore {
    inner: RwLock<Inventory>,
}

impl MemoryStore {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inner: RwLock::new(inventory),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(Inventory::load(path)?))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inventory>> {
        self.inner.read().map_err(|_| {
            tracing::error!("Inventory lock poisoned on read");
            RentalError::Store {
                reason: "inventory lock poisoned".into(),
            }
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inventory>> {
        self.inner.write().map_err(|_| {
            tracing::error!("Inventory lock poisoned on write");
            RentalError::Store {
                reason: "inventory lock poisoned".into(),
            }
        })
    }

    /// Appends a booking without any capacity check. Pairing this with a
    /// separate availability read is racy: two writers can both pass the read.
    pub fn insert_booking(&self, record: BookingRecord) -> Result<()> {
        self.write()?.bookings.push(record);
        Ok(())
    }

    /// Checks capacity and appends the booking under the same write lock, so
    /// concurrent reservations for overlapping dates cannot both succeed.
    pub fn reserve(
        &self,
        request: &BookingRequest,
        today: NaiveDate,
        settings: &BookingConfig,
    ) -> Result<BookingRecord> {
        let request = request.validate()?;
        let mut inventory = self.write()?;
        let resource = inventory
            .resources
            .iter()
            .find(|r| r.active && r.id == request.resource_id)
            .cloned()
            .ok_or_else(|| RentalError::ResourceNotFound {
                id: request.resource_id.to_string(),
            })?;
        check_booking(
            &resource,
            &request,
            &inventory.bookings,
            &inventory.blocks,
            today,
            settings.default_min_units,
            &settings.base_season_label,
        )?;
        let record = request.to_record(BookingStatus::PendingPayment);
        inventory.bookings.push(record.clone());
        tracing::info!(
            resource = %request.resource_id,
            quantity = request.quantity,
            "booking reserved"
        );
        Ok(record)
    }

    pub fn bookings(&self) -> Result<Vec<BookingRecord>> {
        Ok(self.read()?.bookings.clone())
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>> {
        Ok(self
            .read()?
            .resources
            .iter()
            .find(|r| r.active && &r.id == id)
            .cloned())
    }

    async fn get_resources(&self, ids: &[ResourceId]) -> Result<Vec<Resource>> {
        Ok(self
            .read()?
            .resources
            .iter()
            .filter(|r| r.active && ids.contains(&r.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn occupying_bookings(
        &self,
        resource_ids: &[ResourceId],
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<BookingRecord>> {
        Ok(self
            .read()?
            .bookings
            .iter()
            .filter(|b| b.status.is_occupying())
            .filter(|b| belongs_to(b.resource.as_ref(), resource_ids))
            .filter(|b| {
                may_overlap(
                    b.start_date.as_deref(),
                    b.end_date.as_deref(),
                    from,
                    to_exclusive,
                )
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn active_blocks(
        &self,
        resource_ids: &[ResourceId],
        from: NaiveDate,
        to_exclusive: NaiveDate,
    ) -> Result<Vec<BlockRecord>> {
        Ok(self
            .read()?
            .blocks
            .iter()
            .filter(|b| b.active)
            .filter(|b| belongs_to(b.resource.as_ref(), resource_ids))
            .filter(|b| {
                may_overlap(
                    b.date_from.as_deref(),
                    b.date_to.as_deref(),
                    from,
                    to_exclusive,
                )
            })
            .cloned()
            .collect())
    }
}
