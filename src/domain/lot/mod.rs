//! Lot aggregate
//!
//! A lot is a named facility with an hourly price and a capacity that always
//! matches the number of spot rows it owns.

pub mod model;
pub mod repository;

pub use model::{Lot, NewLot};
pub use repository::LotRepository;
