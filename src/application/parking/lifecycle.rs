//! Check-in, check-out and cancellation

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::lot_locks::LotLocks;
use super::reservation_ledger::ReservationLedger;
use super::spot_registry::SpotRegistry;
use crate::application::events::{Event, ReservationSnapshot, SharedEventBus};
use crate::domain::{DomainError, DomainResult, Principal, Reservation, SpotStatus};

pub struct LifecycleController {
    registry: Arc<SpotRegistry>,
    ledger: Arc<ReservationLedger>,
    locks: Arc<LotLocks>,
    event_bus: SharedEventBus,
}

impl LifecycleController {
    pub fn new(
        registry: Arc<SpotRegistry>,
        ledger: Arc<ReservationLedger>,
        locks: Arc<LotLocks>,
        event_bus: SharedEventBus,
    ) -> Self {
        Self {
            registry,
            ledger,
            locks,
            event_bus,
        }
    }

    /// Load a reservation the principal may act on. Other users'
    /// reservations look like missing ones.
    pub async fn visible(&self, principal: &Principal, reservation_id: i32) -> DomainResult<Reservation> {
        let reservation = self.ledger.get(reservation_id).await?;
        if !principal.can_access(&reservation.user_id) {
            return Err(DomainError::not_found("Reservation", reservation_id));
        }
        Ok(reservation)
    }

    /// Lot that an active reservation's spot belongs to.
    async fn lot_of(&self, reservation: &Reservation, action: &str) -> DomainResult<i32> {
        reservation.require_active(action)?;
        Ok(self.ledger.held_spot(reservation).await?.lot_id)
    }

    pub async fn check_in(&self, principal: &Principal, reservation_id: i32) -> DomainResult<Reservation> {
        let reservation = self.visible(principal, reservation_id).await?;
        let lot_id = self.lot_of(&reservation, "check in").await?;
        let _guard = self.locks.acquire(lot_id).await?;

        // Re-read under the lot lock
        let reservation = self.ledger.get(reservation_id).await?;
        reservation.require_active("check in")?;
        let spot = self.ledger.held_spot(&reservation).await?;
        self.registry.set_status(spot.id, SpotStatus::Occupied).await?;

        info!(reservation_id, lot_id, spot_id = spot.id, "Checked in");
        Ok(reservation)
    }

    /// The only path that produces a cost.
    pub async fn check_out(
        &self,
        principal: &Principal,
        reservation_id: i32,
        end_time: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let reservation = self.visible(principal, reservation_id).await?;
        let lot_id = self.lot_of(&reservation, "check out").await?;
        let completed = {
            let _guard = self.locks.acquire(lot_id).await?;
            self.ledger.complete(reservation_id, end_time).await?
        };

        metrics::counter!("parking_checkouts_total").increment(1);
        self.event_bus.publish(Event::ReservationCompleted(ReservationSnapshot::new(
            &completed,
            Some(lot_id),
        )));
        Ok(completed)
    }

    pub async fn cancel(&self, principal: &Principal, reservation_id: i32) -> DomainResult<Reservation> {
        let reservation = self.visible(principal, reservation_id).await?;
        let lot_id = self.lot_of(&reservation, "cancel").await?;
        let cancelled = {
            let _guard = self.locks.acquire(lot_id).await?;
            self.ledger.cancel(reservation_id).await?
        };

        metrics::counter!("parking_cancellations_total").increment(1);
        self.event_bus.publish(Event::ReservationCancelled(ReservationSnapshot::new(
            &cancelled,
            Some(lot_id),
        )));
        Ok(cancelled)
    }
}
