pub mod illuminance;
pub mod weather;
