use chrono::NaiveDate;

/// Source of "today" as a UTC calendar day.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}
