pub mod booking;
pub mod dates;
pub mod occupancy;
pub mod pricing;
pub mod resource;
pub mod selection;
