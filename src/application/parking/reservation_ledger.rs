//! Reservation records and the one-active-reservation-per-spot rule.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::spot_registry::SpotRegistry;
use crate::domain::billing::compute_cost;
use crate::domain::{
    DomainError, DomainResult, NewReservation, RepositoryProvider, Reservation, Spot, SpotStatus,
};

pub struct ReservationLedger {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<SpotRegistry>,
}

impl ReservationLedger {
    pub fn new(repos: Arc<dyn RepositoryProvider>, registry: Arc<SpotRegistry>) -> Self {
        Self { repos, registry }
    }

    /// New Active reservation, committed together with the spot's move to
    /// Reserved.
    pub async fn create(
        &self,
        user_id: &str,
        spot_id: i32,
        start_time: DateTime<Utc>,
        vehicle_number: Option<String>,
    ) -> DomainResult<Reservation> {
        let reservation = self
            .repos
            .reservations()
            .create_claiming_spot(NewReservation {
                user_id: user_id.to_string(),
                spot_id,
                vehicle_number,
                start_time,
            })
            .await?;
        info!(
            reservation_id = reservation.id,
            spot_id,
            user_id,
            "Reservation created"
        );
        Ok(reservation)
    }

    pub async fn get(&self, reservation_id: i32) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or(DomainError::not_found("Reservation", reservation_id))
    }

    /// Newest first.
    pub async fn list_by_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        self.repos.reservations().find_by_user(user_id).await
    }

    /// Newest first.
    pub async fn list_all(&self) -> DomainResult<Vec<Reservation>> {
        self.repos.reservations().find_all().await
    }

    /// The spot an active reservation holds.
    pub async fn held_spot(&self, reservation: &Reservation) -> DomainResult<Spot> {
        let spot_id = reservation.spot_id.ok_or_else(|| {
            DomainError::Storage(format!(
                "active reservation {} has no spot",
                reservation.id
            ))
        })?;
        self.registry.require_spot(spot_id).await
    }

    /// Bill and close an Active reservation on an Occupied spot, releasing
    /// the spot.
    pub async fn complete(
        &self,
        reservation_id: i32,
        end_time: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let reservation = self.get(reservation_id).await?;
        reservation.require_active("complete")?;

        let spot = self.held_spot(&reservation).await?;
        if spot.status != SpotStatus::Occupied {
            return Err(DomainError::InvalidTransition(format!(
                "reservation {} has not checked in",
                reservation_id
            )));
        }
        if end_time <= reservation.start_time {
            return Err(DomainError::InvalidInput(format!(
                "end {} must be after start {}",
                end_time.to_rfc3339(),
                reservation.start_time.to_rfc3339()
            )));
        }
        let lot = self.registry.require_lot(spot.lot_id).await?;
        let cost = compute_cost(reservation.start_time, end_time, lot.hourly_price)?;

        let completed = self
            .repos
            .reservations()
            .complete_releasing_spot(reservation_id, end_time, cost)
            .await?;
        info!(
            reservation_id,
            lot_id = lot.id,
            spot_id = spot.id,
            cost = %cost,
            "Reservation completed"
        );
        Ok(completed)
    }

    /// Withdraw an Active reservation before check-in. The record is
    /// deleted; the returned snapshot carries state Cancelled.
    pub async fn cancel(&self, reservation_id: i32) -> DomainResult<Reservation> {
        let reservation = self.get(reservation_id).await?;
        reservation.require_active("cancel")?;

        let spot = self.held_spot(&reservation).await?;
        if spot.status == SpotStatus::Occupied {
            return Err(DomainError::Conflict(format!(
                "reservation {} is checked in; check out instead",
                reservation_id
            )));
        }

        let cancelled = self
            .repos
            .reservations()
            .delete_releasing_spot(reservation_id)
            .await?;
        info!(reservation_id, lot_id = spot.lot_id, spot_id = spot.id, "Reservation cancelled");
        Ok(cancelled)
    }
}
