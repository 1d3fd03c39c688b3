use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::types::BookingConfig;
use crate::domain::booking::{BookingRequest, check_booking};
use crate::domain::dates::{add_days_utc, format_iso_date, parse_iso_date_only};
use crate::domain::occupancy::{
    OccupancySnapshot, QueryWindow, collect_demands, compute_occupancy, tally_by_resource,
};
use crate::domain::pricing::{PriceQuote, quote_range_labeled};
use crate::domain::resource::{Resource, ResourceId, UnitType};
use crate::domain::selection::{DayStatuses, RangeSelection};
use crate::error::{RentalError, Result};
use crate::ports::clock::Clock;
use crate::ports::store::{BlockStore, BookingStore, ResourceStore};

/// Availability of one resource, shaped for painting a calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AvailabilityView {
    pub resource_id: Option<ResourceId>,
    pub unit_type: Option<UnitType>,
    pub booked: Vec<String>,
    pub unavailable: Vec<String>,
    pub remaining_by_day: BTreeMap<String, u32>,
    pub stock: u32,
}

impl AvailabilityView {
    /// Neutral result for unusable parameters.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining_by_day.is_empty()
    }
}

impl From<&OccupancySnapshot> for AvailabilityView {
    fn from(snapshot: &OccupancySnapshot) -> Self {
        Self {
            resource_id: Some(snapshot.resource_id.clone()),
            unit_type: Some(snapshot.unit_type),
            booked: snapshot.booked().into_iter().map(format_iso_date).collect(),
            unavailable: snapshot
                .unavailable()
                .into_iter()
                .map(format_iso_date)
                .collect(),
            remaining_by_day: snapshot.remaining_by_day(),
            stock: snapshot.stock,
        }
    }
}

impl std::fmt::Display for AvailabilityView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some(id) = &self.resource_id else {
            return writeln!(f, "No availability data for these parameters.");
        };
        let unit = self.unit_type.unwrap_or_default();
        writeln!(f, "Availability for resource {id} (stock {}, per {unit})", self.stock)?;
        writeln!(f, "{:<12} {:>9} {:>8}", "Date", "Remaining", "Status")?;
        writeln!(f, "{}", "-".repeat(31))?;
        let booked: HashSet<&str> = self.booked.iter().map(String::as_str).collect();
        let unavailable: HashSet<&str> = self.unavailable.iter().map(String::as_str).collect();
        for (day, remaining) in &self.remaining_by_day {
            let status = if unavailable.contains(day.as_str()) {
                "closed"
            } else if booked.contains(day.as_str()) {
                "booked"
            } else {
                "free"
            };
            writeln!(f, "{day:<12} {remaining:>9} {status:>8}")?;
        }
        Ok(())
    }
}

/// A quote together with the minimum stay that binds the range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StayQuote {
    pub resource_id: ResourceId,
    pub quote: PriceQuote,
    pub min_units: u32,
    pub meets_minimum: bool,
}

impl std::fmt::Display for StayQuote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Price quote for resource {}", self.resource_id)?;
        write!(f, "{}", self.quote)?;
        if self.quote.segments.is_empty() {
            return Ok(());
        }
        if self.meets_minimum {
            writeln!(f, "Minimum stay of {} unit(s) met.", self.min_units)
        } else {
            writeln!(
                f,
                "Too short: at least {} unit(s) required, {} selected.",
                self.min_units,
                self.quote.units()
            )
        }
    }
}

/// Read-side orchestration over the stores.
pub struct AvailabilityService {
    resources: Arc<dyn ResourceStore>,
    bookings: Arc<dyn BookingStore>,
    blocks: Arc<dyn BlockStore>,
    clock: Arc<dyn Clock>,
    settings: BookingConfig,
}

impl AvailabilityService {
    pub fn new(
        resources: Arc<dyn ResourceStore>,
        bookings: Arc<dyn BookingStore>,
        blocks: Arc<dyn BlockStore>,
        clock: Arc<dyn Clock>,
        settings: BookingConfig,
    ) -> Self {
        Self {
            resources,
            bookings,
            blocks,
            clock,
            settings,
        }
    }

    /// Convenience for adapters that implement all three stores.
    pub fn from_store<S>(store: Arc<S>, clock: Arc<dyn Clock>, settings: BookingConfig) -> Self
    where
        S: ResourceStore + BookingStore + BlockStore + 'static,
    {
        Self::new(
            Arc::clone(&store) as Arc<dyn ResourceStore>,
            Arc::clone(&store) as Arc<dyn BookingStore>,
            store as Arc<dyn BlockStore>,
            clock,
            settings,
        )
    }

    pub fn settings(&self) -> &BookingConfig {
        &self.settings
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Parses an inclusive `from..=to` window, rejecting empty or oversized
    /// ones.
    fn window(&self, from: &str, to: &str) -> Option<QueryWindow> {
        let window = QueryWindow::parse_inclusive(from, to)?;
        if window.is_empty() {
            return None;
        }
        if window.len_days() > self.settings.max_window_days {
            warn!(
                from,
                to,
                max = self.settings.max_window_days,
                "availability window too long"
            );
            return None;
        }
        Some(window)
    }

    /// Occupancy of one resource, `None` if the resource is unknown or
    /// inactive.
    pub async fn snapshot(
        &self,
        id: &ResourceId,
        window: &QueryWindow,
    ) -> Result<Option<OccupancySnapshot>> {
        let Some(resource) = self.resources.get_resource(id).await? else {
            return Ok(None);
        };
        Ok(Some(self.snapshot_of(&resource, window).await?))
    }

    async fn snapshot_of(&self, resource: &Resource, window: &QueryWindow) -> Result<OccupancySnapshot> {
        let today = self.clock.today();
        if resource.effective_stock() == 0 {
            return Ok(compute_occupancy(resource, window, &[], &[], today));
        }
        let ids = [resource.id.clone()];
        let (bookings, blocks) = tokio::try_join!(
            self.bookings
                .occupying_bookings(&ids, window.storage_from(), window.to_exclusive),
            self.blocks
                .active_blocks(&ids, window.storage_from(), window.to_exclusive),
        )?;
        let snapshot = compute_occupancy(resource, window, &bookings, &blocks, today);
        debug!(
            resource = %resource.id,
            days = snapshot.days.len(),
            bookings = bookings.len(),
            blocks = blocks.len(),
            "occupancy computed"
        );
        Ok(snapshot)
    }

    /// Single-resource range query over `from..=to`.
    ///
    /// Unusable parameters and unknown resources give an empty view; storage
    /// failures are returned as errors.
    pub async fn resource_availability(
        &self,
        resource_id: &str,
        from: &str,
        to: &str,
    ) -> Result<AvailabilityView> {
        let (Some(id), Some(window)) = (ResourceId::parse(resource_id), self.window(from, to))
        else {
            debug!(resource_id, from, to, "invalid availability query, returning empty view");
            return Ok(AvailabilityView::empty());
        };
        match self.snapshot(&id, &window).await? {
            Some(snapshot) => Ok(AvailabilityView::from(&snapshot)),
            None => {
                warn!(resource = %id, "availability requested for unknown resource");
                Ok(AvailabilityView::empty())
            }
        }
    }

    /// Batch existence query: ids (in input order, deduplicated) of the
    /// resources with no saturated day in `from..=to`.
    ///
    /// Issues one resource read, one booking read and one block read no
    /// matter how many ids are given.
    pub async fn available_resources(
        &self,
        resource_ids: &[String],
        from: &str,
        to: &str,
    ) -> Result<Vec<ResourceId>> {
        let mut seen = HashSet::new();
        let ids: Vec<ResourceId> = resource_ids
            .iter()
            .filter_map(|raw| ResourceId::parse(raw))
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let Some(window) = self.window(from, to) else {
            return Ok(Vec::new());
        };
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let stocked: HashMap<ResourceId, Resource> = self
            .resources
            .get_resources(&ids)
            .await?
            .into_iter()
            .filter(|r| r.active && r.effective_stock() > 0)
            .map(|r| (r.id.clone(), r))
            .collect();
        if stocked.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<ResourceId> = ids
            .iter()
            .filter(|id| stocked.contains_key(*id))
            .cloned()
            .collect();
        let (bookings, blocks) = tokio::try_join!(
            self.bookings
                .occupying_bookings(&candidates, window.storage_from(), window.to_exclusive),
            self.blocks
                .active_blocks(&candidates, window.storage_from(), window.to_exclusive),
        )?;

        let unit_types: HashMap<ResourceId, UnitType> = stocked
            .iter()
            .map(|(id, r)| (id.clone(), r.unit_type))
            .collect();
        let demands = collect_demands(&bookings, &blocks);
        let tallies = tally_by_resource(&unit_types, &demands, &window);

        let available: Vec<ResourceId> = candidates
            .into_iter()
            .filter(|id| {
                let stock = stocked[id].effective_stock();
                tallies
                    .get(id)
                    .is_none_or(|tally| !tally.saturates(stock, &window))
            })
            .collect();
        debug!(
            requested = ids.len(),
            available = available.len(),
            "batch availability computed"
        );
        Ok(available)
    }

    /// Applies a calendar click to the current selection of a resource.
    ///
    /// `Ok(None)` means the click was rejected and the selection is unchanged.
    pub async fn select_range(
        &self,
        resource_id: &str,
        clicked: &str,
        current: RangeSelection,
    ) -> Result<Option<RangeSelection>> {
        let id = ResourceId::parse(resource_id).ok_or_else(|| RentalError::InvalidParams {
            reason: "resource id is required".into(),
        })?;
        let clicked = parse_iso_date_only(clicked).ok_or_else(|| RentalError::InvalidParams {
            reason: format!("invalid day '{clicked}', expected YYYY-MM-DD"),
        })?;
        let resource = self
            .resources
            .get_resource(&id)
            .await?
            .ok_or_else(|| RentalError::ResourceNotFound { id: id.to_string() })?;

        // Cover every day the transition could inspect.
        let candidates = [Some(clicked), current.start, current.end];
        let first = candidates.iter().flatten().min().copied().unwrap_or(clicked);
        let last = candidates.iter().flatten().max().copied().unwrap_or(clicked);
        let window = QueryWindow::inclusive(first, add_days_utc(last, 1));
        let snapshot = self.snapshot_of(&resource, &window).await?;

        Ok(current.click(clicked, &DayStatuses::from(&snapshot), resource.unit_type))
    }

    /// Prices `[start, end)` for a resource. Missing or unparseable bounds
    /// give an empty quote.
    pub async fn quote(
        &self,
        resource_id: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<StayQuote> {
        let id = ResourceId::parse(resource_id).ok_or_else(|| RentalError::InvalidParams {
            reason: "resource id is required".into(),
        })?;
        let resource = self
            .resources
            .get_resource(&id)
            .await?
            .ok_or_else(|| RentalError::ResourceNotFound { id: id.to_string() })?;

        let bounds = start
            .and_then(parse_iso_date_only)
            .zip(end.and_then(parse_iso_date_only));
        let quote = match bounds {
            Some((start, end)) => quote_range_labeled(
                resource.base_price,
                &resource.seasonal_prices,
                start,
                end,
                &self.settings.base_season_label,
            ),
            None => PriceQuote {
                segments: Vec::new(),
                required_min_units: 0,
                total: 0.0,
            },
        };
        let min_units =
            quote.binding_min_units(resource.min_units.unwrap_or(self.settings.default_min_units));
        Ok(StayQuote {
            resource_id: id,
            meets_minimum: quote.units() >= min_units,
            min_units,
            quote,
        })
    }

    /// Pre-write validation for the booking path. Reads current occupancy and
    /// rejects the request if it cannot be honoured right now.
    pub async fn validate_booking(&self, request: &BookingRequest) -> Result<PriceQuote> {
        let request = request.validate()?;
        let resource = self
            .resources
            .get_resource(&request.resource_id)
            .await?
            .ok_or_else(|| RentalError::ResourceNotFound {
                id: request.resource_id.to_string(),
            })?;
        let window = request.occupied_window(&resource);
        let ids = [resource.id.clone()];
        let (bookings, blocks) = tokio::try_join!(
            self.bookings
                .occupying_bookings(&ids, window.storage_from(), window.to_exclusive),
            self.blocks
                .active_blocks(&ids, window.storage_from(), window.to_exclusive),
        )?;
        check_booking(
            &resource,
            &request,
            &bookings,
            &blocks,
            self.clock.today(),
            self.settings.default_min_units,
            &self.settings.base_season_label,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{Inventory, MemoryStore};
    use crate::domain::resource::BookingStatus;
    use crate::test_helpers::*;
    use pretty_assertions::assert_eq;

    fn service(inventory: Inventory) -> AvailabilityService {
        AvailabilityService::from_store(
            Arc::new(MemoryStore::new(inventory)),
            Arc::new(FixedClock(day("2024-05-01"))),
            BookingConfig::default(),
        )
    }

    fn sample() -> Inventory {
        Inventory {
            resources: vec![
                resource("t1", UnitType::Night, 1),
                resource("b1", UnitType::Day, 2),
                resource("empty", UnitType::Day, 0),
            ],
            bookings: vec![
                booking("t1", "2024-06-01", "2024-06-05", 1, BookingStatus::Paid),
                booking("b1", "2024-06-03", "2024-06-04", 2, BookingStatus::Confirmed),
            ],
            blocks: vec![],
        }
    }

    #[tokio::test]
    async fn single_query_reports_booked_days() {
        let svc = service(sample());
        let view = svc
            .resource_availability("t1", "2024-06-01", "2024-06-07")
            .await
            .unwrap();
        assert_eq!(
            view.booked,
            vec!["2024-06-01", "2024-06-02", "2024-06-03", "2024-06-04", "2024-06-05"]
        );
        assert_eq!(view.remaining_by_day.len(), 7);
        assert_eq!(view.remaining_by_day["2024-06-06"], 1);
        assert_eq!(view.stock, 1);
    }

    #[tokio::test]
    async fn invalid_params_give_neutral_view() {
        let svc = service(sample());
        for (id, from, to) in [
            ("", "2024-06-01", "2024-06-07"),
            ("t1", "June", "2024-06-07"),
            ("t1", "2024-06-07", "2024-06-01"),
            ("t1", "2024-01-01", "2026-01-01"),
            ("missing", "2024-06-01", "2024-06-07"),
        ] {
            let view = svc.resource_availability(id, from, to).await.unwrap();
            assert!(view.is_empty(), "expected empty view for {id} {from} {to}");
            assert!(view.booked.is_empty());
        }
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let svc = AvailabilityService::new(
            Arc::new(FailingStore),
            Arc::new(FailingStore),
            Arc::new(FailingStore),
            Arc::new(FixedClock(day("2024-05-01"))),
            BookingConfig::default(),
        );
        let err = svc
            .resource_availability("t1", "2024-06-01", "2024-06-07")
            .await
            .unwrap_err();
        assert!(err.is_infrastructure());
        assert!(
            svc.available_resources(&["t1".into()], "2024-06-01", "2024-06-07")
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn batch_excludes_saturated_zero_stock_and_unknown() {
        let svc = service(sample());
        let ids: Vec<String> = ["t1", "b1", "empty", "ghost", "b1"]
            .into_iter()
            .map(String::from)
            .collect();
        let available = svc
            .available_resources(&ids, "2024-06-06", "2024-06-10")
            .await
            .unwrap();
        // t1's return day is 06-05, so from 06-06 it is free; b1 is free too.
        assert_eq!(
            available,
            vec![ResourceId::parse("t1").unwrap(), ResourceId::parse("b1").unwrap()]
        );

        let available = svc
            .available_resources(&ids, "2024-06-03", "2024-06-03")
            .await
            .unwrap();
        assert!(available.is_empty());
    }

    #[tokio::test]
    async fn batch_with_invalid_window_is_empty() {
        let svc = service(sample());
        let available = svc
            .available_resources(&["t1".into()], "bad", "2024-06-03")
            .await
            .unwrap();
        assert!(available.is_empty());
    }

    #[tokio::test]
    async fn select_range_uses_current_occupancy() {
        let svc = service(sample());
        let start = svc
            .select_range("t1", "2024-05-28", RangeSelection::EMPTY)
            .await
            .unwrap()
            .unwrap();
        // [05-28, 06-03) crosses booked nights
        assert_eq!(svc.select_range("t1", "2024-06-03", start).await.unwrap(), None);
        // 06-01 is booked, so it cannot be the return day either
        assert_eq!(svc.select_range("t1", "2024-06-01", start).await.unwrap(), None);
        let complete = svc.select_range("t1", "2024-05-31", start).await.unwrap();
        assert_eq!(
            complete,
            Some(RangeSelection::complete(day("2024-05-28"), day("2024-05-31")))
        );
    }

    #[tokio::test]
    async fn select_range_rejects_past_days() {
        let svc = service(sample());
        assert_eq!(
            svc.select_range("b1", "2024-04-01", RangeSelection::EMPTY)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn select_range_unknown_resource_errors() {
        let svc = service(sample());
        assert!(matches!(
            svc.select_range("ghost", "2024-06-01", RangeSelection::EMPTY)
                .await,
            Err(RentalError::ResourceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn quote_applies_default_minimum() {
        let mut inventory = sample();
        inventory.resources[0].seasonal_prices =
            vec![season("Summer", "2024-07-01", "2024-07-10", 150.0, Some(3))];
        let svc = service(inventory);
        let stay = svc
            .quote("t1", Some("2024-06-29"), Some("2024-07-03"))
            .await
            .unwrap();
        assert_eq!(stay.quote.segments.len(), 2);
        assert_eq!(stay.min_units, 3);
        assert!(stay.meets_minimum);

        let short = svc
            .quote("t1", Some("2024-07-01"), Some("2024-07-03"))
            .await
            .unwrap();
        assert!(!short.meets_minimum);
        assert!(short.to_string().contains("at least 3 unit(s)"));
    }

    #[tokio::test]
    async fn quote_with_missing_bounds_is_empty() {
        let svc = service(sample());
        let stay = svc.quote("t1", None, Some("2024-07-03")).await.unwrap();
        assert!(stay.quote.segments.is_empty());
        assert_eq!(stay.quote.required_min_units, 0);
    }

    #[tokio::test]
    async fn validate_booking_reads_current_state() {
        let svc = service(sample());
        let request = BookingRequest {
            resource_id: "t1".into(),
            start_date: "2024-06-06".into(),
            end_date: "2024-06-08".into(),
            quantity: 1,
        };
        assert!(svc.validate_booking(&request).await.is_ok());
        let clash = BookingRequest {
            start_date: "2024-06-05".into(),
            ..request
        };
        assert!(matches!(
            svc.validate_booking(&clash).await,
            Err(RentalError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn view_display_marks_statuses() {
        let view = AvailabilityView {
            resource_id: ResourceId::parse("t1"),
            unit_type: Some(UnitType::Night),
            booked: vec!["2024-06-02".into()],
            unavailable: vec!["2024-06-01".into()],
            remaining_by_day: BTreeMap::from([
                ("2024-06-01".into(), 1),
                ("2024-06-02".into(), 0),
                ("2024-06-03".into(), 1),
            ]),
            stock: 1,
        };
        let s = view.to_string();
        assert!(s.contains("resource t1"));
        assert!(s.contains("per night"));
        let line = |d: &str| s.lines().find(|l| l.starts_with(d)).unwrap().to_string();
        assert!(line("2024-06-01").ends_with("closed"));
        assert!(line("2024-06-02").ends_with("booked"));
        assert!(line("2024-06-03").ends_with("free"));
    }

    #[test]
    fn empty_view_display() {
        assert!(
            AvailabilityView::empty()
                .to_string()
                .contains("No availability data")
        );
    }
}
