use chrono::NaiveDate;
use serde::Serialize;

use super::dates::{format_iso_date, iter_days};
use super::resource::SeasonalRow;

/// Label used for units priced at the base rate.
pub const BASE_SEASON_LABEL: &str = "Poza sezonem";

/// A run of contiguous units sharing the same season and price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSegment {
    pub label: String,
    pub first_day: String,
    pub units: u32,
    pub price_per_unit: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    pub segments: Vec<PriceSegment>,
    /// Strictest minimum stay among the seasonal rows the range touches.
    pub required_min_units: u32,
    pub total: f64,
}

impl PriceQuote {
    pub fn units(&self) -> u32 {
        self.segments.iter().map(|s| s.units).sum()
    }

    /// Combines the seasonal minimum with a resource-level default.
    pub fn binding_min_units(&self, default_min_units: u32) -> u32 {
        default_min_units.max(self.required_min_units)
    }
}

/// Prices `[start, end)` unit by unit.
///
/// Each unit takes the price of the first seasonal row containing its day,
/// falling back to `base_price`. Rows are matched in list order, so when two
/// rows overlap the earlier one wins. Rows with malformed dates never match.
pub fn quote_range(
    base_price: f64,
    seasonal_rows: &[SeasonalRow],
    start: NaiveDate,
    end: NaiveDate,
) -> PriceQuote {
    quote_range_labeled(base_price, seasonal_rows, start, end, BASE_SEASON_LABEL)
}

pub fn quote_range_labeled(
    base_price: f64,
    seasonal_rows: &[SeasonalRow],
    start: NaiveDate,
    end: NaiveDate,
    base_label: &str,
) -> PriceQuote {
    let mut segments: Vec<PriceSegment> = Vec::new();
    let mut required_min_units = 0;

    for day in iter_days(start, end) {
        let season = seasonal_rows.iter().find(|row| row.contains(day));
        let (label, price) = match season {
            Some(row) => {
                required_min_units = required_min_units.max(row.min_units.unwrap_or(0));
                (row.name.as_str(), row.price_per_unit)
            }
            None => (base_label, base_price),
        };

        match segments.last_mut() {
            Some(current)
                if current.label == label
                    && (current.price_per_unit - price).abs() < f64::EPSILON =>
            {
                current.units += 1;
                current.total = current.price_per_unit * f64::from(current.units);
            }
            _ => segments.push(PriceSegment {
                label: label.to_string(),
                first_day: format_iso_date(day),
                units: 1,
                price_per_unit: price,
                total: price,
            }),
        }
    }

    let total = segments.iter().map(|s| s.total).sum();
    PriceQuote {
        segments,
        required_min_units,
        total,
    }
}

impl std::fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return writeln!(f, "Empty range, nothing to price.");
        }
        writeln!(
            f,
            "{:<20} {:<12} {:>6} {:>10} {:>10}",
            "Season", "From", "Units", "Price", "Total"
        )?;
        writeln!(f, "{}", "-".repeat(62))?;
        for segment in &self.segments {
            writeln!(
                f,
                "{:<20} {:<12} {:>6} {:>10.2} {:>10.2}",
                segment.label,
                segment.first_day,
                segment.units,
                segment.price_per_unit,
                segment.total
            )?;
        }
        writeln!(f, "{}", "-".repeat(62))?;
        writeln!(f, "Total: {:.2} for {} unit(s)", self.total, self.units())?;
        if self.required_min_units > 0 {
            writeln!(f, "Seasonal minimum stay: {} unit(s)", self.required_min_units)?;
        }
        Ok(())
    }
}
