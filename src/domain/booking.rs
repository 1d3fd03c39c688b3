//! Pre-write validation of a new booking against current occupancy.
//!
//! The write path calls [`check_booking`] before committing. It does not
//! make the write atomic by itself; callers that need hard overbooking
//! prevention must run the check and the insert under one per-resource
//! critical section (see `MemoryStore::reserve`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::{count_days, format_iso_date, parse_iso_date_only};
use super::occupancy::{Demand, DemandKind, QueryWindow, compute_occupancy};
use super::pricing::{PriceQuote, quote_range_labeled};
use super::resource::{BlockRecord, BookingRecord, BookingStatus, Resource, ResourceId};
use crate::error::{RentalError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub resource_id: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// A request whose fields have been parsed and checked for shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub resource_id: ResourceId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub quantity: u32,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<ValidatedRequest> {
        let resource_id =
            ResourceId::parse(&self.resource_id).ok_or_else(|| RentalError::InvalidParams {
                reason: "resource id is required".into(),
            })?;
        let start = parse_iso_date_only(&self.start_date).ok_or_else(|| {
            RentalError::InvalidParams {
                reason: format!(
                    "invalid start date '{}', expected YYYY-MM-DD",
                    self.start_date
                ),
            }
        })?;
        let end =
            parse_iso_date_only(&self.end_date).ok_or_else(|| RentalError::InvalidParams {
                reason: format!("invalid end date '{}', expected YYYY-MM-DD", self.end_date),
            })?;
        if end <= start {
            return Err(RentalError::InvalidParams {
                reason: "end date must be after start date".into(),
            });
        }
        if self.quantity == 0 {
            return Err(RentalError::InvalidParams {
                reason: "quantity must be at least 1".into(),
            });
        }
        Ok(ValidatedRequest {
            resource_id,
            start,
            end,
            quantity: self.quantity,
        })
    }
}

impl ValidatedRequest {
    fn as_demand(&self) -> Demand {
        Demand {
            resource: self.resource_id.clone(),
            start: self.start,
            end: self.end,
            quantity: self.quantity,
            kind: DemandKind::Booking,
        }
    }

    /// Days the booking would occupy once stored, return day included for
    /// night resources.
    pub fn occupied_window(&self, resource: &Resource) -> QueryWindow {
        QueryWindow {
            from: self.start,
            to_exclusive: self.as_demand().occupied_end(resource.unit_type),
        }
    }

    pub fn units(&self) -> u32 {
        count_days(self.start, self.end)
    }

    /// The record to persist once the check passes.
    pub fn to_record(&self, status: BookingStatus) -> BookingRecord {
        BookingRecord {
            resource: Some(self.resource_id.clone()),
            start_date: Some(format_iso_date(self.start)),
            end_date: Some(format_iso_date(self.end)),
            quantity: Some(self.quantity),
            status,
        }
    }
}

/// Rejects the request when it starts in the past, is shorter than the
/// binding minimum stay, or when any day it would occupy cannot take
/// `quantity` more units. Returns the price quote on success.
pub fn check_booking(
    resource: &Resource,
    request: &ValidatedRequest,
    bookings: &[BookingRecord],
    blocks: &[BlockRecord],
    today: NaiveDate,
    default_min_units: u32,
    base_label: &str,
) -> Result<PriceQuote> {
    if request.start < today {
        return Err(RentalError::InvalidParams {
            reason: format!("start date {} is in the past", format_iso_date(request.start)),
        });
    }

    let quote = quote_range_labeled(
        resource.base_price,
        &resource.seasonal_prices,
        request.start,
        request.end,
        base_label,
    );
    let required = quote.binding_min_units(resource.min_units.unwrap_or(default_min_units));
    let units = request.units();
    if units < required {
        return Err(RentalError::MinimumStay {
            required,
            actual: units,
        });
    }

    let window = request.occupied_window(resource);
    let snapshot = compute_occupancy(resource, &window, bookings, blocks, today);
    if let Some((day, remaining)) = snapshot.shortfall(window.from, window.to_exclusive, request.quantity)
    {
        return Err(RentalError::CapacityExceeded {
            day: format_iso_date(day),
            remaining,
            requested: request.quantity,
        });
    }
    Ok(quote)
}
