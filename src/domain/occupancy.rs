//! Capacity accounting: folds bookings and blocks into per-day usage for a
//! resource and derives remaining capacity, booked days and unavailable days.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::dates::{add_days_utc, count_days, format_iso_date, iter_days, overlaps, parse_iso_date_only};
use super::resource::{BlockRecord, BookingRecord, Resource, ResourceId, UnitType};

/// Half-open day window `[from, to_exclusive)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QueryWindow {
    pub from: NaiveDate,
    pub to_exclusive: NaiveDate,
}

impl QueryWindow {
    /// Window covering `from..=to`. Empty when `to < from`.
    pub fn inclusive(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to_exclusive: add_days_utc(to, 1),
        }
    }

    pub fn parse_inclusive(from: &str, to: &str) -> Option<Self> {
        Some(Self::inclusive(
            parse_iso_date_only(from)?,
            parse_iso_date_only(to)?,
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.to_exclusive <= self.from
    }

    pub fn len_days(&self) -> u32 {
        count_days(self.from, self.to_exclusive)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        iter_days(self.from, self.to_exclusive)
    }

    /// Lower bound to use when querying storage: one day earlier so that a
    /// competing interval ending on `from` still contributes its return day.
    pub fn storage_from(&self) -> NaiveDate {
        add_days_utc(self.from, -1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemandKind {
    Booking,
    Block,
}

/// Why a storage row was left out of the accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedRecord {
    MissingResource,
    BadDate,
    EmptyInterval,
    ZeroQuantity,
}

impl std::fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingResource => write!(f, "missing resource"),
            Self::BadDate => write!(f, "missing or unparseable date"),
            Self::EmptyInterval => write!(f, "end not after start"),
            Self::ZeroQuantity => write!(f, "missing or zero quantity"),
        }
    }
}

/// A validated claim on some units of a resource over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demand {
    pub resource: ResourceId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub quantity: u32,
    pub kind: DemandKind,
}

impl Demand {
    /// `Ok(None)` for rows that are well-formed but do not occupy capacity
    /// (cancelled bookings).
    pub fn from_booking(record: &BookingRecord) -> Result<Option<Self>, MalformedRecord> {
        if !record.status.is_occupying() {
            return Ok(None);
        }
        Self::validated(
            record.resource.as_ref(),
            record.start_date.as_deref(),
            record.end_date.as_deref(),
            record.quantity,
            DemandKind::Booking,
        )
        .map(Some)
    }

    /// `Ok(None)` for inactive blocks.
    pub fn from_block(record: &BlockRecord) -> Result<Option<Self>, MalformedRecord> {
        if !record.active {
            return Ok(None);
        }
        Self::validated(
            record.resource.as_ref(),
            record.date_from.as_deref(),
            record.date_to.as_deref(),
            record.quantity,
            DemandKind::Block,
        )
        .map(Some)
    }

    fn validated(
        resource: Option<&ResourceId>,
        start: Option<&str>,
        end: Option<&str>,
        quantity: Option<u32>,
        kind: DemandKind,
    ) -> Result<Self, MalformedRecord> {
        let resource = resource.ok_or(MalformedRecord::MissingResource)?.clone();
        let start = start
            .and_then(parse_iso_date_only)
            .ok_or(MalformedRecord::BadDate)?;
        let end = end
            .and_then(parse_iso_date_only)
            .ok_or(MalformedRecord::BadDate)?;
        if end <= start {
            return Err(MalformedRecord::EmptyInterval);
        }
        let quantity = quantity
            .filter(|q| *q > 0)
            .ok_or(MalformedRecord::ZeroQuantity)?;
        Ok(Self {
            resource,
            start,
            end,
            quantity,
            kind,
        })
    }

    /// Exclusive end of the days this demand actually occupies.
    pub fn occupied_end(&self, unit_type: UnitType) -> NaiveDate {
        if unit_type.blocks_return_day() {
            add_days_utc(self.end, 1)
        } else {
            self.end
        }
    }
}

/// Collects the demands of bookings and blocks, skipping rows that do not
/// occupy capacity and logging the malformed ones.
pub fn collect_demands(bookings: &[BookingRecord], blocks: &[BlockRecord]) -> Vec<Demand> {
    let mut skipped = 0usize;
    let booking_demands = bookings.iter().map(Demand::from_booking);
    let block_demands = blocks.iter().map(Demand::from_block);
    let demands: Vec<Demand> = booking_demands
        .chain(block_demands)
        .filter_map(|admitted| match admitted {
            Ok(demand) => demand,
            Err(reason) => {
                skipped += 1;
                tracing::warn!(%reason, "skipping malformed occupancy record");
                None
            }
        })
        .collect();
    if skipped > 0 {
        tracing::debug!(skipped, counted = demands.len(), "occupancy records filtered");
    }
    demands
}

/// Per-day usage counters for one resource, restricted to a window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageTally {
    used: BTreeMap<NaiveDate, u32>,
    blocked: BTreeMap<NaiveDate, u32>,
}

impl UsageTally {
    pub fn add(&mut self, demand: &Demand, unit_type: UnitType, window: &QueryWindow) {
        let occupied_end = demand.occupied_end(unit_type);
        if !overlaps(demand.start, occupied_end, window.from, window.to_exclusive) {
            return;
        }
        let first = demand.start.max(window.from);
        let last = occupied_end.min(window.to_exclusive);
        for day in iter_days(first, last) {
            let used = self.used.entry(day).or_default();
            *used = used.saturating_add(demand.quantity);
            if demand.kind == DemandKind::Block {
                let blocked = self.blocked.entry(day).or_default();
                *blocked = blocked.saturating_add(demand.quantity);
            }
        }
    }

    /// Bookings and blocks together.
    pub fn used(&self, day: NaiveDate) -> u32 {
        self.used.get(&day).copied().unwrap_or(0)
    }

    /// Blocks alone.
    pub fn blocked(&self, day: NaiveDate) -> u32 {
        self.blocked.get(&day).copied().unwrap_or(0)
    }

    /// True when some day in the window has `used >= stock`.
    pub fn saturates(&self, stock: u32, window: &QueryWindow) -> bool {
        window.days().any(|day| self.used(day) >= stock)
    }
}

/// Tallies for many resources at once, keyed by id. Demands for resources
/// not present in `unit_types` are ignored.
pub fn tally_by_resource(
    unit_types: &HashMap<ResourceId, UnitType>,
    demands: &[Demand],
    window: &QueryWindow,
) -> HashMap<ResourceId, UsageTally> {
    let mut tallies: HashMap<ResourceId, UsageTally> = HashMap::new();
    for demand in demands {
        let Some(unit_type) = unit_types.get(&demand.resource) else {
            continue;
        };
        tallies
            .entry(demand.resource.clone())
            .or_default()
            .add(demand, *unit_type, window);
    }
    tallies
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayOccupancy {
    pub used: u32,
    pub remaining: u32,
    pub booked: bool,
    pub unavailable: bool,
}

impl DayOccupancy {
    pub fn is_available(&self) -> bool {
        !self.booked && !self.unavailable
    }
}

/// Occupancy of one resource over one window. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancySnapshot {
    pub resource_id: ResourceId,
    pub unit_type: UnitType,
    pub stock: u32,
    pub window: QueryWindow,
    pub days: BTreeMap<NaiveDate, DayOccupancy>,
}

impl OccupancySnapshot {
    pub fn booked(&self) -> Vec<NaiveDate> {
        self.days_where(|d| d.booked)
    }

    pub fn unavailable(&self) -> Vec<NaiveDate> {
        self.days_where(|d| d.unavailable)
    }

    pub fn remaining_by_day(&self) -> BTreeMap<String, u32> {
        self.days
            .iter()
            .map(|(day, occ)| (format_iso_date(*day), occ.remaining))
            .collect()
    }

    pub fn day(&self, day: NaiveDate) -> Option<&DayOccupancy> {
        self.days.get(&day)
    }

    /// First day of `[start, end)` inside the window that cannot take
    /// `quantity` more units, with its remaining capacity.
    pub fn shortfall(&self, start: NaiveDate, end: NaiveDate, quantity: u32) -> Option<(NaiveDate, u32)> {
        iter_days(start, end)
            .filter_map(|day| self.days.get(&day).map(|occ| (day, occ.remaining)))
            .find(|(_, remaining)| *remaining < quantity)
    }

    fn days_where(&self, pred: impl Fn(&DayOccupancy) -> bool) -> Vec<NaiveDate> {
        self.days
            .iter()
            .filter(|(_, occ)| pred(occ))
            .map(|(day, _)| *day)
            .collect()
    }
}

/// Per-day occupancy of `resource` over `window`.
///
/// Rows for other resources, cancelled bookings, inactive blocks and
/// malformed rows are ignored. Days before `today` are unavailable.
pub fn compute_occupancy(
    resource: &Resource,
    window: &QueryWindow,
    bookings: &[BookingRecord],
    blocks: &[BlockRecord],
    today: NaiveDate,
) -> OccupancySnapshot {
    let stock = resource.effective_stock();
    let mut snapshot = OccupancySnapshot {
        resource_id: resource.id.clone(),
        unit_type: resource.unit_type,
        stock,
        window: *window,
        days: BTreeMap::new(),
    };

    if stock == 0 {
        snapshot.days = window
            .days()
            .map(|day| {
                (
                    day,
                    DayOccupancy {
                        used: 0,
                        remaining: 0,
                        booked: false,
                        unavailable: true,
                    },
                )
            })
            .collect();
        return snapshot;
    }

    let mut tally = UsageTally::default();
    for demand in collect_demands(bookings, blocks)
        .iter()
        .filter(|d| d.resource == resource.id)
    {
        tally.add(demand, resource.unit_type, window);
    }
    snapshot.days = occupancy_days(&tally, stock, window, today);
    snapshot
}

/// Turns a tally into per-day occupancy for a resource with `stock > 0`.
pub fn occupancy_days(
    tally: &UsageTally,
    stock: u32,
    window: &QueryWindow,
    today: NaiveDate,
) -> BTreeMap<NaiveDate, DayOccupancy> {
    window
        .days()
        .map(|day| {
            let used = tally.used(day);
            let occupancy = DayOccupancy {
                used,
                remaining: stock.saturating_sub(used),
                booked: used >= stock,
                unavailable: tally.blocked(day) >= stock || day < today,
            };
            (day, occupancy)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::BookingStatus;
    use crate::test_helpers::{block, booking, day, resource};
    use pretty_assertions::assert_eq;

    fn june_window() -> QueryWindow {
        QueryWindow::inclusive(day("2024-06-01"), day("2024-06-10"))
    }

    fn past() -> NaiveDate {
        day("2024-01-01")
    }

    #[test]
    fn inclusive_window_covers_last_day() {
        let window = QueryWindow::inclusive(day("2024-06-01"), day("2024-06-03"));
        assert_eq!(window.len_days(), 3);
        assert_eq!(window.to_exclusive, day("2024-06-04"));
    }

    #[test]
    fn inverted_window_is_empty() {
        let window = QueryWindow::inclusive(day("2024-06-05"), day("2024-06-01"));
        assert!(window.is_empty());
        assert_eq!(window.days().count(), 0);
    }

    #[test]
    fn night_booking_blocks_return_day() {
        let trailer = resource("t1", UnitType::Night, 1);
        let bookings = vec![booking("t1", "2024-06-01", "2024-06-05", 1, BookingStatus::Paid)];
        let snap = compute_occupancy(&trailer, &june_window(), &bookings, &[], past());
        assert_eq!(
            snap.booked(),
            vec![
                day("2024-06-01"),
                day("2024-06-02"),
                day("2024-06-03"),
                day("2024-06-04"),
                day("2024-06-05"),
            ]
        );
        assert!(snap.day(day("2024-06-06")).unwrap().is_available());
    }

    #[test]
    fn day_booking_frees_end_day() {
        let bike = resource("b1", UnitType::Day, 1);
        let bookings = vec![booking("b1", "2024-06-01", "2024-06-05", 1, BookingStatus::Confirmed)];
        let snap = compute_occupancy(&bike, &june_window(), &bookings, &[], past());
        assert_eq!(snap.booked().len(), 4);
        assert!(snap.day(day("2024-06-05")).unwrap().is_available());
    }

    #[test]
    fn remaining_is_stock_minus_used() {
        let bike = resource("b1", UnitType::Day, 3);
        let bookings = vec![
            booking("b1", "2024-06-02", "2024-06-04", 1, BookingStatus::PendingPayment),
            booking("b1", "2024-06-03", "2024-06-05", 1, BookingStatus::DepositPaid),
        ];
        let blocks = vec![block("b1", "2024-06-03", "2024-06-04", 1, true)];
        let snap = compute_occupancy(&bike, &june_window(), &bookings, &blocks, past());
        assert_eq!(snap.day(day("2024-06-02")).unwrap().remaining, 2);
        let busiest = snap.day(day("2024-06-03")).unwrap();
        assert_eq!(busiest.used, 3);
        assert_eq!(busiest.remaining, 0);
        assert!(busiest.booked);
        assert!(!busiest.unavailable);
        assert_eq!(snap.booked(), vec![day("2024-06-03")]);
    }

    #[test]
    fn overbooked_day_clamps_remaining_at_zero() {
        let bike = resource("b1", UnitType::Day, 1);
        let bookings = vec![
            booking("b1", "2024-06-02", "2024-06-03", 1, BookingStatus::Paid),
            booking("b1", "2024-06-02", "2024-06-03", 1, BookingStatus::Paid),
        ];
        let snap = compute_occupancy(&bike, &june_window(), &bookings, &[], past());
        let occ = snap.day(day("2024-06-02")).unwrap();
        assert_eq!(occ.used, 2);
        assert_eq!(occ.remaining, 0);
    }

    #[test]
    fn cancelled_and_inactive_do_not_count() {
        let bike = resource("b1", UnitType::Day, 1);
        let bookings = vec![booking("b1", "2024-06-02", "2024-06-04", 1, BookingStatus::Cancelled)];
        let blocks = vec![block("b1", "2024-06-02", "2024-06-04", 1, false)];
        let snap = compute_occupancy(&bike, &june_window(), &bookings, &blocks, past());
        assert!(snap.booked().is_empty());
        assert!(snap.unavailable().is_empty());
    }

    #[test]
    fn blocks_alone_saturating_mark_unavailable() {
        let trailer = resource("t1", UnitType::Night, 2);
        let blocks = vec![block("t1", "2024-06-03", "2024-06-04", 2, true)];
        let snap = compute_occupancy(&trailer, &june_window(), &[], &blocks, past());
        // night resource: block covers 06-03 plus its return day 06-04
        assert_eq!(snap.unavailable(), vec![day("2024-06-03"), day("2024-06-04")]);
        assert_eq!(snap.booked(), snap.unavailable());
    }

    #[test]
    fn zero_stock_is_unavailable_never_booked() {
        let trailer = resource("t1", UnitType::Night, 0);
        let bookings = vec![booking("t1", "2024-06-01", "2024-06-05", 1, BookingStatus::Paid)];
        let snap = compute_occupancy(&trailer, &june_window(), &bookings, &[], past());
        assert!(snap.booked().is_empty());
        assert_eq!(snap.unavailable().len(), 10);
        assert!(snap.days.values().all(|d| d.remaining == 0));
    }

    #[test]
    fn past_days_are_unavailable() {
        let bike = resource("b1", UnitType::Day, 1);
        let snap = compute_occupancy(&bike, &june_window(), &[], &[], day("2024-06-04"));
        assert_eq!(
            snap.unavailable(),
            vec![day("2024-06-01"), day("2024-06-02"), day("2024-06-03")]
        );
        assert!(snap.booked().is_empty());
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let bike = resource("b1", UnitType::Day, 1);
        let mut broken_dates = booking("b1", "2024-06-02", "2024-06-04", 1, BookingStatus::Paid);
        broken_dates.start_date = Some("06/02/2024".into());
        let mut no_quantity = booking("b1", "2024-06-02", "2024-06-04", 1, BookingStatus::Paid);
        no_quantity.quantity = None;
        let mut no_resource = booking("b1", "2024-06-02", "2024-06-04", 1, BookingStatus::Paid);
        no_resource.resource = None;
        let inverted = booking("b1", "2024-06-04", "2024-06-02", 1, BookingStatus::Paid);
        let bookings = vec![broken_dates, no_quantity, no_resource, inverted];
        let snap = compute_occupancy(&bike, &june_window(), &bookings, &[], past());
        assert!(snap.booked().is_empty());
    }

    #[test]
    fn other_resources_are_ignored() {
        let bike = resource("b1", UnitType::Day, 1);
        let bookings = vec![booking("b2", "2024-06-02", "2024-06-04", 1, BookingStatus::Paid)];
        let snap = compute_occupancy(&bike, &june_window(), &bookings, &[], past());
        assert!(snap.booked().is_empty());
    }

    #[test]
    fn return_day_reaches_into_window_start() {
        let trailer = resource("t1", UnitType::Night, 1);
        // ends on the window's first day; that day is its return day
        let bookings = vec![booking("t1", "2024-05-28", "2024-06-01", 1, BookingStatus::Paid)];
        let snap = compute_occupancy(&trailer, &june_window(), &bookings, &[], past());
        assert_eq!(snap.booked(), vec![day("2024-06-01")]);
    }

    #[test]
    fn empty_window_yields_no_days() {
        let bike = resource("b1", UnitType::Day, 1);
        let window = QueryWindow::inclusive(day("2024-06-05"), day("2024-06-04"));
        let snap = compute_occupancy(&bike, &window, &[], &[], past());
        assert!(snap.days.is_empty());
    }

    #[test]
    fn shortfall_reports_first_short_day() {
        let bike = resource("b1", UnitType::Day, 2);
        let bookings = vec![booking("b1", "2024-06-03", "2024-06-05", 1, BookingStatus::Paid)];
        let snap = compute_occupancy(&bike, &june_window(), &bookings, &[], past());
        assert_eq!(snap.shortfall(day("2024-06-01"), day("2024-06-06"), 1), None);
        assert_eq!(
            snap.shortfall(day("2024-06-01"), day("2024-06-06"), 2),
            Some((day("2024-06-03"), 1))
        );
    }

    #[test]
    fn computation_is_idempotent() {
        let trailer = resource("t1", UnitType::Night, 2);
        let bookings = vec![booking("t1", "2024-06-02", "2024-06-06", 1, BookingStatus::Paid)];
        let blocks = vec![block("t1", "2024-06-04", "2024-06-05", 1, true)];
        let first = compute_occupancy(&trailer, &june_window(), &bookings, &blocks, past());
        let second = compute_occupancy(&trailer, &june_window(), &bookings, &blocks, past());
        assert_eq!(first, second);
    }

    #[test]
    fn tally_by_resource_ignores_unknown_ids() {
        let window = june_window();
        let demands = collect_demands(
            &[
                booking("a", "2024-06-01", "2024-06-03", 1, BookingStatus::Paid),
                booking("ghost", "2024-06-01", "2024-06-03", 1, BookingStatus::Paid),
            ],
            &[],
        );
        let unit_types = HashMap::from([(ResourceId::parse("a").unwrap(), UnitType::Day)]);
        let tallies = tally_by_resource(&unit_types, &demands, &window);
        assert_eq!(tallies.len(), 1);
        let tally = &tallies[&ResourceId::parse("a").unwrap()];
        assert_eq!(tally.used(day("2024-06-02")), 1);
        assert!(tally.saturates(1, &window));
        assert!(!tally.saturates(2, &window));
    }
}
