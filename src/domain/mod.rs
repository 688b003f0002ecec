pub mod clock;
pub mod geo;
pub mod models;
pub mod usage;
