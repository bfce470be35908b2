//! Spot aggregate
//!
//! One bookable unit of capacity inside a lot, with the three-state
//! Available / Reserved / Occupied machine.

pub mod model;
pub mod repository;

pub use model::{Spot, SpotStatus, SpotStatusCounts};
pub use repository::SpotRepository;
