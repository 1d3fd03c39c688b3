use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::dates::parse_iso_date_only;

/// Canonical resource identifier.
///
/// Upstream records carry ids as either JSON strings or numbers; both are
/// normalised into a trimmed string here so nothing deeper branches on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        let raw = match RawId::deserialize(deserializer)? {
            RawId::Unsigned(n) => n.to_string(),
            RawId::Signed(n) => n.to_string(),
            RawId::Text(s) => s,
        };
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom("empty resource id"))
    }
}

/// How a resource is consumed over a date range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Consumed between check-in and checkout; the checkout day stays
    /// blocked for turnover.
    #[default]
    Night,
    /// Consumed inclusively, no extra blocked day.
    Day,
}

impl UnitType {
    /// Whether the exclusive end day of a competing interval is occupied too.
    pub fn blocks_return_day(self) -> bool {
        matches!(self, Self::Night)
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Night => write!(f, "night"),
            Self::Day => write!(f, "day"),
        }
    }
}

/// Seasonal price override with an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonalRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    pub price_per_unit: f64,
    #[serde(default)]
    pub min_units: Option<u32>,
}

impl SeasonalRow {
    /// Inclusive `(from, to)` bounds, or `None` when the row is malformed.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let from = parse_iso_date_only(self.date_from.as_deref()?)?;
        let to = parse_iso_date_only(self.date_to.as_deref()?)?;
        (from <= to).then_some((from, to))
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.bounds()
            .is_some_and(|(from, to)| from <= day && day <= to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit_type: UnitType,
    #[serde(default)]
    pub stock: i64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub base_price: f64,
    #[serde(default)]
    pub seasonal_prices: Vec<SeasonalRow>,
    /// Resource-level default minimum stay, combined with seasonal minimums.
    #[serde(default)]
    pub min_units: Option<u32>,
}

impl Resource {
    /// Stock clamped to zero; negative upstream values mean "none".
    pub fn effective_stock(&self) -> u32 {
        u32::try_from(self.stock.max(0)).unwrap_or(u32::MAX)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    DepositPaid,
    Paid,
    Confirmed,
    Cancelled,
    /// Any status this crate does not know about. Never occupies capacity.
    #[serde(other)]
    Unknown,
}

impl BookingStatus {
    pub const OCCUPYING: [Self; 4] = [
        Self::PendingPayment,
        Self::DepositPaid,
        Self::Paid,
        Self::Confirmed,
    ];

    pub fn is_occupying(self) -> bool {
        Self::OCCUPYING.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::DepositPaid => "deposit_paid",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

/// Booking row as read from storage. Fields stay loose so that one corrupt
/// row can be skipped instead of failing the whole read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    #[serde(default)]
    pub resource: Option<ResourceId>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    pub status: BookingStatus,
}

/// Manual administrative hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    #[serde(default)]
    pub resource: Option<ResourceId>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub active: bool,
}
