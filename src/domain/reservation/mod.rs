//! Reservation aggregate
//!
//! Contains the Reservation entity, its lifecycle state, and the
//! repository interface.

pub mod model;
pub mod repository;

pub use model::{NewReservation, Reservation, ReservationState};
pub use repository::ReservationRepository;
