//! In-memory storage implementation
//!
//! All three tables live behind a single `RwLock`, so every compound
//! operation is atomic with respect to every other one.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use crate::domain::{
    DomainError, DomainResult, Lot, LotRepository, NewLot, NewReservation, RepositoryProvider,
    Reservation, ReservationRepository, ReservationState, Spot, SpotRepository, SpotStatus,
    SpotStatusCounts,
};

#[derive(Default)]
struct MemoryState {
    lots: BTreeMap<i32, Lot>,
    spots: BTreeMap<i32, Spot>,
    reservations: BTreeMap<i32, Reservation>,
    lot_seq: i32,
    spot_seq: i32,
    reservation_seq: i32,
}

impl MemoryState {
    fn lot(&self, id: i32) -> DomainResult<&Lot> {
        self.lots.get(&id).ok_or(DomainError::not_found("Lot", id))
    }

    fn spots_of(&self, lot_id: i32) -> impl Iterator<Item = &Spot> {
        self.spots.values().filter(move |s| s.lot_id == lot_id)
    }

    fn push_spots(&mut self, lot_id: i32, count: u32) {
        for _ in 0..count {
            self.spot_seq += 1;
            self.spots.insert(self.spot_seq, Spot::new(self.spot_seq, lot_id));
        }
    }

    fn cas_spot(&mut self, spot_id: i32, expected: SpotStatus, next: SpotStatus) -> DomainResult<Spot> {
        let spot = self
            .spots
            .get_mut(&spot_id)
            .ok_or(DomainError::not_found("Spot", spot_id))?;
        if spot.status != expected {
            return Err(DomainError::Conflict(format!(
                "spot {} is {}, expected {}",
                spot_id, spot.status, expected
            )));
        }
        spot.status = next;
        Ok(spot.clone())
    }

    fn detach_spots(&mut self, spot_ids: &[i32]) {
        for r in self.reservations.values_mut() {
            if r.spot_id.is_some_and(|id| spot_ids.contains(&id)) {
                r.spot_id = None;
            }
        }
    }

    fn newest_first<'a>(iter: impl Iterator<Item = &'a Reservation>) -> Vec<Reservation> {
        let mut out: Vec<Reservation> = iter.cloned().collect();
        out.sort_by(|a, b| b.id.cmp(&a.id));
        out
    }
}

/// In-memory storage for development and testing
#[derive(Default)]
pub struct InMemoryStorage {
    state: RwLock<MemoryState>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryStorage {
    fn lots(&self) -> &dyn LotRepository {
        self
    }

    fn spots(&self) -> &dyn SpotRepository {
        self
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        self
    }
}

#[async_trait]
impl LotRepository for InMemoryStorage {
    async fn create_with_spots(&self, new: NewLot) -> DomainResult<Lot> {
        let mut state = self.state.write().await;
        state.lot_seq += 1;
        let now = Utc::now();
        let lot = Lot {
            id: state.lot_seq,
            name: new.name,
            address: new.address,
            pin_code: new.pin_code,
            hourly_price: new.hourly_price,
            capacity: new.capacity,
            created_at: now,
            updated_at: now,
        };
        state.lots.insert(lot.id, lot.clone());
        state.push_spots(lot.id, new.capacity);
        Ok(lot)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Lot>> {
        Ok(self.state.read().await.lots.get(&id).cloned())
    }

    async fn find_all(&self) -> DomainResult<Vec<Lot>> {
        Ok(self.state.read().await.lots.values().cloned().collect())
    }

    async fn add_spots(&self, lot_id: i32, count: u32) -> DomainResult<Lot> {
        let mut state = self.state.write().await;
        state.lot(lot_id)?;
        state.push_spots(lot_id, count);
        let lot = state
            .lots
            .get_mut(&lot_id)
            .ok_or(DomainError::not_found("Lot", lot_id))?;
        lot.capacity += count;
        lot.updated_at = Utc::now();
        Ok(lot.clone())
    }

    async fn remove_available_spots(
        &self,
        lot_id: i32,
        count: u32,
    ) -> DomainResult<(Lot, Vec<i32>)> {
        let mut state = self.state.write().await;
        state.lot(lot_id)?;

        let victims: Vec<i32> = state
            .spots_of(lot_id)
            .filter(|s| s.status == SpotStatus::Available)
            .take(count as usize)
            .map(|s| s.id)
            .collect();
        if victims.len() < count as usize {
            return Err(DomainError::Conflict(format!(
                "not enough available spots: requested {}, available {}",
                count,
                victims.len()
            )));
        }

        state.detach_spots(&victims);
        for id in &victims {
            state.spots.remove(id);
        }
        let lot = state
            .lots
            .get_mut(&lot_id)
            .ok_or(DomainError::not_found("Lot", lot_id))?;
        lot.capacity -= count;
        lot.updated_at = Utc::now();
        Ok((lot.clone(), victims))
    }

    async fn delete_cascade(&self, lot_id: i32) -> DomainResult<Lot> {
        let mut state = self.state.write().await;
        state.lot(lot_id)?;

        let counts: SpotStatusCounts = state.spots_of(lot_id).collect();
        if counts.in_use() > 0 {
            return Err(DomainError::Conflict(format!(
                "cannot delete lot {}: {} occupied and {} reserved spots",
                lot_id, counts.occupied, counts.reserved
            )));
        }

        let ids: Vec<i32> = state.spots_of(lot_id).map(|s| s.id).collect();
        state.detach_spots(&ids);
        for id in &ids {
            state.spots.remove(id);
        }
        state
            .lots
            .remove(&lot_id)
            .ok_or(DomainError::not_found("Lot", lot_id))
    }
}

#[async_trait]
impl SpotRepository for InMemoryStorage {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Spot>> {
        Ok(self.state.read().await.spots.get(&id).cloned())
    }

    async fn find_by_lot(&self, lot_id: i32) -> DomainResult<Vec<Spot>> {
        Ok(self.state.read().await.spots_of(lot_id).cloned().collect())
    }

    async fn find_available(&self, lot_id: i32, limit: u32) -> DomainResult<Vec<Spot>> {
        Ok(self
            .state
            .read()
            .await
            .spots_of(lot_id)
            .filter(|s| s.status == SpotStatus::Available)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn status_counts(&self, lot_id: i32) -> DomainResult<SpotStatusCounts> {
        Ok(self.state.read().await.spots_of(lot_id).collect())
    }

    async fn compare_and_set_status(
        &self,
        spot_id: i32,
        expected: SpotStatus,
        next: SpotStatus,
    ) -> DomainResult<Spot> {
        self.state.write().await.cas_spot(spot_id, expected, next)
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStorage {
    async fn create_claiming_spot(&self, new: NewReservation) -> DomainResult<Reservation> {
        let mut state = self.state.write().await;

        if state
            .reservations
            .values()
            .any(|r| r.is_active() && r.spot_id == Some(new.spot_id))
        {
            return Err(DomainError::Conflict(format!(
                "spot {} already has an active reservation",
                new.spot_id
            )));
        }
        state.cas_spot(new.spot_id, SpotStatus::Available, SpotStatus::Reserved)?;

        state.reservation_seq += 1;
        let reservation = Reservation {
            id: state.reservation_seq,
            user_id: new.user_id,
            spot_id: Some(new.spot_id),
            vehicle_number: new.vehicle_number,
            start_time: new.start_time,
            end_time: None,
            cost: None,
            state: ReservationState::Active,
            created_at: Utc::now(),
        };
        state.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        Ok(self.state.read().await.reservations.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        let state = self.state.read().await;
        Ok(MemoryState::newest_first(
            state.reservations.values().filter(|r| r.user_id == user_id),
        ))
    }

    async fn find_all(&self) -> DomainResult<Vec<Reservation>> {
        let state = self.state.read().await;
        Ok(MemoryState::newest_first(state.reservations.values()))
    }

    async fn find_active_for_spot(&self, spot_id: i32) -> DomainResult<Option<Reservation>> {
        let state = self.state.read().await;
        Ok(state
            .reservations
            .values()
            .find(|r| r.is_active() && r.spot_id == Some(spot_id))
            .cloned())
    }

    async fn complete_releasing_spot(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        cost: Decimal,
    ) -> DomainResult<Reservation> {
        let mut state = self.state.write().await;
        let mut reservation = state
            .reservations
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Reservation", id))?;
        reservation.complete(end_time, cost)?;

        if let Some(spot_id) = reservation.spot_id {
            state.cas_spot(spot_id, SpotStatus::Occupied, SpotStatus::Available)?;
        }
        state.reservations.insert(id, reservation.clone());
        Ok(reservation)
    }

    async fn delete_releasing_spot(&self, id: i32) -> DomainResult<Reservation> {
        let mut state = self.state.write().await;
        let mut reservation = state
            .reservations
            .get(&id)
            .cloned()
            .ok_or(DomainError::not_found("Reservation", id))?;
        reservation.cancel()?;

        if let Some(spot_id) = reservation.spot_id {
            state.cas_spot(spot_id, SpotStatus::Reserved, SpotStatus::Available)?;
        }
        state.reservations.remove(&id);
        Ok(reservation)
    }
}
