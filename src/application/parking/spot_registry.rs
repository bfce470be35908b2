//! Ownership of a lot's spots and their status.

use std::sync::Arc;

use tracing::info;

use crate::domain::{
    DomainError, DomainResult, Lot, RepositoryProvider, Reservation, Spot, SpotStatus,
    SpotStatusCounts,
};

/// A spot together with the reservation currently holding it.
#[derive(Debug, Clone)]
pub struct SpotDetail {
    pub spot: Spot,
    pub reservation: Option<Reservation>,
}

pub struct SpotRegistry {
    repos: Arc<dyn RepositoryProvider>,
}

impl SpotRegistry {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn require_lot(&self, lot_id: i32) -> DomainResult<Lot> {
        self.repos
            .lots()
            .find_by_id(lot_id)
            .await?
            .ok_or(DomainError::not_found("Lot", lot_id))
    }

    pub async fn require_spot(&self, spot_id: i32) -> DomainResult<Spot> {
        self.repos
            .spots()
            .find_by_id(spot_id)
            .await?
            .ok_or(DomainError::not_found("Spot", spot_id))
    }

    /// Spots of a lot ordered by id.
    pub async fn list_spots(&self, lot_id: i32) -> DomainResult<Vec<Spot>> {
        self.require_lot(lot_id).await?;
        self.repos.spots().find_by_lot(lot_id).await
    }

    pub async fn list_spots_with_reservations(&self, lot_id: i32) -> DomainResult<Vec<SpotDetail>> {
        let spots = self.list_spots(lot_id).await?;
        let mut details = Vec::with_capacity(spots.len());
        for spot in spots {
            let reservation = if spot.status.is_in_use() {
                self.repos.reservations().find_active_for_spot(spot.id).await?
            } else {
                None
            };
            details.push(SpotDetail { spot, reservation });
        }
        Ok(details)
    }

    /// Single-query snapshot of the lot's status distribution.
    pub async fn status_counts(&self, lot_id: i32) -> DomainResult<SpotStatusCounts> {
        self.require_lot(lot_id).await?;
        self.repos.spots().status_counts(lot_id).await
    }

    /// Append `count` Available spots and bump capacity to match.
    pub async fn create_spots(&self, lot_id: i32, count: u32) -> DomainResult<Lot> {
        if count == 0 {
            return Err(DomainError::InvalidInput(
                "spot count must be greater than zero".into(),
            ));
        }
        let lot = self.repos.lots().add_spots(lot_id, count).await?;
        info!(lot_id, added = count, capacity = lot.capacity, "Spots created");
        Ok(lot)
    }

    /// Delete exactly `count` Available spots, lowest id first, or nothing.
    pub async fn remove_available_spots(
        &self,
        lot_id: i32,
        count: u32,
    ) -> DomainResult<(Lot, Vec<i32>)> {
        if count == 0 {
            return Err(DomainError::InvalidInput(
                "spot count must be greater than zero".into(),
            ));
        }
        let (lot, removed) = self.repos.lots().remove_available_spots(lot_id, count).await?;
        info!(lot_id, removed = ?removed, capacity = lot.capacity, "Spots removed");
        Ok((lot, removed))
    }

    /// Move a spot along the status machine. The write is conditional on
    /// the status that was validated.
    pub async fn set_status(&self, spot_id: i32, next: SpotStatus) -> DomainResult<Spot> {
        let mut spot = self.require_spot(spot_id).await?;
        let current = spot.status;
        spot.transition(next)?;

        let spot = self
            .repos
            .spots()
            .compare_and_set_status(spot_id, current, next)
            .await?;
        info!(lot_id = spot.lot_id, spot_id, from = %current, to = %next, "Spot status changed");
        Ok(spot)
    }
}
