pub mod clock;
pub mod cms;
pub mod memory;
