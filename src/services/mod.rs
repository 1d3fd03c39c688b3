pub mod availability;
pub mod request_gate;
