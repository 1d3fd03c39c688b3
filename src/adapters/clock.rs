use chrono::{NaiveDate, Utc};

use crate::domain::dates::start_of_day_utc;
use crate::ports::clock::Clock;

/// Wall clock, truncated to the current UTC day.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        start_of_day_utc(Utc::now()).date_naive()
    }
}
