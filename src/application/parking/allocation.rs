//! Claiming a free spot for a new booking

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::lot_locks::LotLocks;
use super::reservation_ledger::ReservationLedger;
use super::spot_registry::SpotRegistry;
use crate::domain::{DomainError, DomainResult, Principal, RepositoryProvider, Reservation};

pub struct AllocationService {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<SpotRegistry>,
    ledger: Arc<ReservationLedger>,
    locks: Arc<LotLocks>,
    max_claim_attempts: u32,
}

impl AllocationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        registry: Arc<SpotRegistry>,
        ledger: Arc<ReservationLedger>,
        locks: Arc<LotLocks>,
        max_claim_attempts: u32,
    ) -> Self {
        Self {
            repos,
            registry,
            ledger,
            locks,
            max_claim_attempts: max_claim_attempts.max(1),
        }
    }

    /// Reserve the lowest-id Available spot in `lot_id` for the principal.
    pub async fn allocate(
        &self,
        principal: &Principal,
        lot_id: i32,
        start_time: DateTime<Utc>,
        vehicle_number: Option<String>,
    ) -> DomainResult<Reservation> {
        let result = self
            .claim(principal, lot_id, start_time, vehicle_number)
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(DomainError::Conflict(_)) => "conflict",
            Err(_) => "error",
        };
        metrics::counter!("parking_allocations_total", "outcome" => outcome).increment(1);
        result
    }

    async fn claim(
        &self,
        principal: &Principal,
        lot_id: i32,
        start_time: DateTime<Utc>,
        vehicle_number: Option<String>,
    ) -> DomainResult<Reservation> {
        self.registry.require_lot(lot_id).await?;
        let _guard = self.locks.acquire(lot_id).await?;

        let candidates = self
            .repos
            .spots()
            .find_available(lot_id, self.max_claim_attempts)
            .await?;

        for spot in candidates {
            match self
                .ledger
                .create(&principal.user_id, spot.id, start_time, vehicle_number.clone())
                .await
            {
                Ok(reservation) => {
                    info!(
                        lot_id,
                        spot_id = spot.id,
                        reservation_id = reservation.id,
                        user_id = %principal.user_id,
                        "Spot allocated"
                    );
                    return Ok(reservation);
                }
                Err(DomainError::Conflict(reason)) => {
                    debug!(lot_id, spot_id = spot.id, %reason, "Lost claim, trying next spot");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(lot_id, user_id = %principal.user_id, "No available spots");
        Err(DomainError::Conflict(format!(
            "no available spots in lot {}",
            lot_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::{NewLot, SpotStatus};
    use crate::infrastructure::InMemoryStorage;

    async fn service(capacity: u32) -> (Arc<AllocationService>, Arc<SpotRegistry>, i32) {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryStorage::new());
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::TEN, capacity))
            .await
            .unwrap();
        let registry = Arc::new(SpotRegistry::new(repos.clone()));
        let ledger = Arc::new(ReservationLedger::new(repos.clone(), registry.clone()));
        let locks = Arc::new(LotLocks::new(Duration::from_secs(5)));
        let service = AllocationService::new(repos, registry.clone(), ledger, locks, 3);
        (Arc::new(service), registry, lot.id)
    }

    #[tokio::test]
    async fn picks_lowest_available_spot() {
        let (service, registry, lot_id) = service(3).await;
        let spots = registry.list_spots(lot_id).await.unwrap();
        registry.set_status(spots[0].id, SpotStatus::Reserved).await.unwrap();

        let r = service
            .allocate(&Principal::user("u1"), lot_id, Utc::now(), None)
            .await
            .unwrap();
        assert_eq!(r.spot_id, Some(spots[1].id));
    }

    #[tokio::test]
    async fn unknown_lot_is_not_found() {
        let (service, _, _) = service(1).await;
        let err = service
            .allocate(&Principal::user("u1"), 99, Utc::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn full_lot_conflicts() {
        let (service, _, lot_id) = service(0).await;
        let err = service
            .allocate(&Principal::user("u1"), lot_id, Utc::now(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(msg) if msg.contains("no available spots")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocations_get_distinct_spots() {
        const CAPACITY: u32 = 16;
        let (service, _, lot_id) = service(CAPACITY).await;

        let mut handles = Vec::new();
        for i in 0..=CAPACITY {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .allocate(&Principal::user(format!("u{}", i)), lot_id, Utc::now(), None)
                    .await
            }));
        }

        let mut spots = HashSet::new();
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(r) => assert!(spots.insert(r.spot_id.unwrap()), "spot granted twice"),
                Err(DomainError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(spots.len(), CAPACITY as usize);
        assert_eq!(conflicts, 1);
    }
}
