pub mod faults;
pub mod geo;
pub mod reports;
