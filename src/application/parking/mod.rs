//! Spot allocation and reservation lifecycle
//!
//! - `SpotRegistry`: spots of a lot and their status machine
//! - `ReservationLedger`: reservation records, billing on completion
//! - `AllocationService`: claim a free spot for a booking
//! - `LifecycleController`: check-in, check-out, cancel
//! - `CapacityManager`: create, resize and delete lots
//! - `ParkingEngine`: facade over all of the above

pub mod allocation;
pub mod capacity;
pub mod engine;
pub mod lifecycle;
pub mod lot_locks;
pub mod reservation_ledger;
pub mod spot_registry;

pub use allocation::AllocationService;
pub use capacity::{CapacityManager, LotView};
pub use engine::{EngineConfig, ParkingEngine};
pub use lifecycle::LifecycleController;
pub use lot_locks::LotLocks;
pub use reservation_ledger::ReservationLedger;
pub use spot_registry::{SpotDetail, SpotRegistry};
