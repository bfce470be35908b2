//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::model::{NewReservation, Reservation};
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// In one transaction: claim the spot (Available → Reserved, CAS) and
    /// insert an Active reservation for it. Conflict if the spot is not
    /// Available or already has an Active reservation.
    async fn create_claiming_spot(&self, reservation: NewReservation) -> DomainResult<Reservation>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>>;

    /// All reservations of a user, newest first
    async fn find_by_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>>;

    /// All reservations, newest first
    async fn find_all(&self) -> DomainResult<Vec<Reservation>>;

    async fn find_active_for_spot(&self, spot_id: i32) -> DomainResult<Option<Reservation>>;

    /// In one transaction: Active → Completed with `end_time` and `cost`,
    /// and release the spot (Occupied → Available, CAS).
    async fn complete_releasing_spot(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        cost: Decimal,
    ) -> DomainResult<Reservation>;

    /// In one transaction: delete an Active reservation whose spot is still
    /// Reserved and release the spot. Returns the removed record marked
    /// Cancelled.
    async fn delete_releasing_spot(&self, id: i32) -> DomainResult<Reservation>;
}
