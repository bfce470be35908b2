pub mod health;
pub mod lots;
pub mod metrics;
pub mod reservations;
