//! Domain layer: entities, state machines, billing and repository ports.

pub mod billing;
pub mod events;
pub mod lot;
pub mod principal;
pub mod repositories;
pub mod reservation;
pub mod spot;

pub use lot::{Lot, LotRepository, NewLot};
pub use principal::Principal;
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{NewReservation, Reservation, ReservationRepository, ReservationState};
pub use spot::{Spot, SpotRepository, SpotStatus, SpotStatusCounts};

pub use crate::shared::errors::DomainError;
