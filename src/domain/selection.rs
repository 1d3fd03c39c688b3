//! Click-driven date range selection.
//!
//! A selection is a `(start, end)` pair where `end` is exclusive. Night
//! resources need two clicks (arrival, then departure); day resources turn
//! a single click into a one-day range and a later click extends it to an
//! inclusive last day. A transition that would cover a day which is not
//! available is rejected.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::{add_days_utc, iter_days};
use super::occupancy::OccupancySnapshot;
use super::resource::UnitType;

/// Booked and unavailable days as currently painted on the calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayStatuses {
    pub booked: BTreeSet<NaiveDate>,
    pub unavailable: BTreeSet<NaiveDate>,
}

impl DayStatuses {
    pub fn new(
        booked: impl IntoIterator<Item = NaiveDate>,
        unavailable: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        Self {
            booked: booked.into_iter().collect(),
            unavailable: unavailable.into_iter().collect(),
        }
    }

    pub fn is_available(&self, day: NaiveDate) -> bool {
        !self.booked.contains(&day) && !self.unavailable.contains(&day)
    }

    /// Every day of `[start, end)` is available.
    pub fn range_available(&self, start: NaiveDate, end: NaiveDate) -> bool {
        iter_days(start, end).all(|day| self.is_available(day))
    }
}

impl From<&OccupancySnapshot> for DayStatuses {
    fn from(snapshot: &OccupancySnapshot) -> Self {
        Self::new(snapshot.booked(), snapshot.unavailable())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSelection {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Empty,
    StartOnly(NaiveDate),
    Complete(NaiveDate, NaiveDate),
}

impl RangeSelection {
    pub const EMPTY: Self = Self {
        start: None,
        end: None,
    };

    pub fn start_only(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn complete(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// An end without a start is treated as empty.
    pub fn state(&self) -> SelectionState {
        match (self.start, self.end) {
            (None, _) => SelectionState::Empty,
            (Some(start), None) => SelectionState::StartOnly(start),
            (Some(start), Some(end)) => SelectionState::Complete(start, end),
        }
    }

    /// Next selection after a click on `clicked`, or `None` when the click is
    /// rejected and the current selection stays as it is.
    pub fn click(
        &self,
        clicked: NaiveDate,
        statuses: &DayStatuses,
        unit_type: UnitType,
    ) -> Option<Self> {
        match unit_type {
            UnitType::Night => self.click_night(clicked, statuses),
            UnitType::Day => self.click_day(clicked, statuses),
        }
    }

    fn click_night(&self, clicked: NaiveDate, statuses: &DayStatuses) -> Option<Self> {
        match self.state() {
            SelectionState::Empty => statuses
                .is_available(clicked)
                .then(|| Self::start_only(clicked)),
            SelectionState::StartOnly(start) | SelectionState::Complete(start, _)
                if clicked == start =>
            {
                Some(Self::EMPTY)
            }
            SelectionState::StartOnly(start) | SelectionState::Complete(start, _)
                if clicked < start =>
            {
                statuses
                    .is_available(clicked)
                    .then(|| Self::start_only(clicked))
            }
            SelectionState::Complete(_, end) if clicked == end => Some(*self),
            // The departure day is held as the return day, so it must be free too.
            SelectionState::StartOnly(start) | SelectionState::Complete(start, _) => statuses
                .range_available(start, add_days_utc(clicked, 1))
                .then(|| Self::complete(start, clicked)),
        }
    }

    fn click_day(&self, clicked: NaiveDate, statuses: &DayStatuses) -> Option<Self> {
        let next_day = add_days_utc(clicked, 1);
        match self.state() {
            SelectionState::Empty => statuses
                .is_available(clicked)
                .then(|| Self::complete(clicked, next_day)),
            SelectionState::StartOnly(start) | SelectionState::Complete(start, _)
                if clicked == start =>
            {
                Some(Self::EMPTY)
            }
            SelectionState::StartOnly(start) | SelectionState::Complete(start, _)
                if clicked < start =>
            {
                statuses
                    .range_available(clicked, next_day)
                    .then(|| Self::complete(clicked, next_day))
            }
            SelectionState::StartOnly(start) | SelectionState::Complete(start, _) => statuses
                .range_available(start, next_day)
                .then(|| Self::complete(start, next_day)),
        }
    }
}
