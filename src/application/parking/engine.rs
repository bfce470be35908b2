//! Facade wiring the parking services over one repository provider.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::allocation::AllocationService;
use super::capacity::{CapacityManager, LotView};
use super::lifecycle::LifecycleController;
use super::lot_locks::LotLocks;
use super::reservation_ledger::ReservationLedger;
use super::spot_registry::{SpotDetail, SpotRegistry};
use crate::application::events::SharedEventBus;
use crate::domain::{DomainResult, Lot, NewLot, Principal, RepositoryProvider, Reservation, Spot};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on waiting for a lot's lock
    pub lock_timeout_ms: u64,
    /// Candidate spots tried per allocation before giving up
    pub max_claim_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            max_claim_attempts: 3,
        }
    }
}

#[derive(Clone)]
pub struct ParkingEngine {
    registry: Arc<SpotRegistry>,
    ledger: Arc<ReservationLedger>,
    allocation: Arc<AllocationService>,
    lifecycle: Arc<LifecycleController>,
    capacity: Arc<CapacityManager>,
    event_bus: SharedEventBus,
}

impl ParkingEngine {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        event_bus: SharedEventBus,
        config: &EngineConfig,
    ) -> Self {
        let locks = Arc::new(LotLocks::new(Duration::from_millis(config.lock_timeout_ms)));
        let registry = Arc::new(SpotRegistry::new(repos.clone()));
        let ledger = Arc::new(ReservationLedger::new(repos.clone(), registry.clone()));
        let allocation = Arc::new(AllocationService::new(
            repos.clone(),
            registry.clone(),
            ledger.clone(),
            locks.clone(),
            config.max_claim_attempts,
        ));
        let lifecycle = Arc::new(LifecycleController::new(
            registry.clone(),
            ledger.clone(),
            locks.clone(),
            event_bus.clone(),
        ));
        let capacity = Arc::new(CapacityManager::new(
            repos,
            registry.clone(),
            locks,
            event_bus.clone(),
        ));

        Self {
            registry,
            ledger,
            allocation,
            lifecycle,
            capacity,
            event_bus,
        }
    }

    pub fn event_bus(&self) -> &SharedEventBus {
        &self.event_bus
    }

    // ── Lots ───────────────────────────────────────────────

    pub async fn create_lot(&self, principal: &Principal, new: NewLot) -> DomainResult<Lot> {
        self.capacity.create_lot(principal, new).await
    }

    pub async fn get_lot(&self, lot_id: i32) -> DomainResult<LotView> {
        self.capacity.get_lot(lot_id).await
    }

    pub async fn list_lots(&self) -> DomainResult<Vec<LotView>> {
        self.capacity.list_lots().await
    }

    pub async fn grow(&self, principal: &Principal, lot_id: i32, extra: u32) -> DomainResult<Lot> {
        self.capacity.grow(principal, lot_id, extra).await
    }

    pub async fn shrink(&self, principal: &Principal, lot_id: i32, n: u32) -> DomainResult<Lot> {
        self.capacity.shrink(principal, lot_id, n).await
    }

    pub async fn resize(&self, principal: &Principal, lot_id: i32, target: u32) -> DomainResult<Lot> {
        self.capacity.resize(principal, lot_id, target).await
    }

    pub async fn delete_lot(&self, principal: &Principal, lot_id: i32) -> DomainResult<Lot> {
        self.capacity.delete_lot(principal, lot_id).await
    }

    // ── Spots ──────────────────────────────────────────────

    pub async fn list_spots(&self, lot_id: i32) -> DomainResult<Vec<Spot>> {
        self.registry.list_spots(lot_id).await
    }

    pub async fn list_spots_with_reservations(
        &self,
        principal: &Principal,
        lot_id: i32,
    ) -> DomainResult<Vec<SpotDetail>> {
        principal.require_admin("view spot reservations")?;
        self.registry.list_spots_with_reservations(lot_id).await
    }

    // ── Reservations ───────────────────────────────────────

    pub async fn allocate(
        &self,
        principal: &Principal,
        lot_id: i32,
        start_time: Option<DateTime<Utc>>,
        vehicle_number: Option<String>,
    ) -> DomainResult<Reservation> {
        let start_time = start_time.unwrap_or_else(Utc::now);
        self.allocation
            .allocate(principal, lot_id, start_time, vehicle_number)
            .await
    }

    pub async fn get_reservation(
        &self,
        principal: &Principal,
        reservation_id: i32,
    ) -> DomainResult<Reservation> {
        self.lifecycle.visible(principal, reservation_id).await
    }

    pub async fn list_my_reservations(&self, principal: &Principal) -> DomainResult<Vec<Reservation>> {
        self.ledger.list_by_user(&principal.user_id).await
    }

    pub async fn list_all_reservations(&self, principal: &Principal) -> DomainResult<Vec<Reservation>> {
        principal.require_admin("list all reservations")?;
        self.ledger.list_all().await
    }

    pub async fn check_in(&self, principal: &Principal, reservation_id: i32) -> DomainResult<Reservation> {
        self.lifecycle.check_in(principal, reservation_id).await
    }

    pub async fn check_out(
        &self,
        principal: &Principal,
        reservation_id: i32,
        end_time: Option<DateTime<Utc>>,
    ) -> DomainResult<Reservation> {
        let end_time = end_time.unwrap_or_else(Utc::now);
        self.lifecycle.check_out(principal, reservation_id, end_time).await
    }

    pub async fn cancel(&self, principal: &Principal, reservation_id: i32) -> DomainResult<Reservation> {
        self.lifecycle.cancel(principal, reservation_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use rust_decimal::Decimal;

    use std::path::PathBuf;

    use sea_orm::DatabaseConnection;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::application::events::{create_event_bus, Event};
    use crate::domain::{DomainError, ReservationState, SpotStatus};
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::{
        init_database, DatabaseConfig, InMemoryStorage, SeaOrmRepositoryProvider,
    };

    fn engine() -> ParkingEngine {
        ParkingEngine::new(
            Arc::new(InMemoryStorage::new()),
            create_event_bus(64),
            &EngineConfig::default(),
        )
    }

    /// Engine over a fresh SQLite file. Drop with [`remove_file_engine`].
    async fn file_engine() -> (ParkingEngine, DatabaseConnection, PathBuf) {
        let path = std::env::temp_dir().join(format!("parking-{}.db", uuid::Uuid::new_v4()));
        let config = DatabaseConfig {
            acquire_timeout_secs: 30,
            ..DatabaseConfig::sqlite(&path.to_string_lossy())
        };
        let db = init_database(&config).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let engine = ParkingEngine::new(
            Arc::new(SeaOrmRepositoryProvider::new(db.clone())),
            create_event_bus(256),
            &EngineConfig {
                lock_timeout_ms: 30_000,
                ..EngineConfig::default()
            },
        );
        (engine, db, path)
    }

    async fn remove_file_engine(db: DatabaseConnection, path: PathBuf) {
        db.close().await.unwrap();
        let _ = std::fs::remove_file(path);
    }

    fn admin() -> Principal {
        Principal::admin("admin")
    }

    async fn lot(engine: &ParkingEngine, price: Decimal, capacity: u32) -> Lot {
        engine
            .create_lot(&admin(), NewLot::new("Central", price, capacity))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn single_spot_scenario() {
        let engine = engine();
        let lot = lot(&engine, Decimal::new(500, 2), 1).await;
        let alice = Principal::user("alice");
        let bob = Principal::user("bob");
        let t0 = Utc::now();

        let a = engine.allocate(&alice, lot.id, Some(t0), None).await.unwrap();
        let err = engine
            .allocate(&bob, lot.id, Some(t0 + ChronoDuration::seconds(1)), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        engine.check_in(&alice, a.id).await.unwrap();
        let done = engine
            .check_out(&alice, a.id, Some(t0 + ChronoDuration::seconds(3600)))
            .await
            .unwrap();
        assert_eq!(done.cost, Some(Decimal::new(500, 2)));
        assert_eq!(done.state, ReservationState::Completed);

        let b = engine
            .allocate(&bob, lot.id, Some(t0 + ChronoDuration::seconds(3601)), None)
            .await
            .unwrap();
        assert_eq!(b.spot_id, a.spot_id);
    }

    #[tokio::test]
    async fn full_lifecycle_then_cancel_fails() {
        let engine = engine();
        let lot = lot(&engine, Decimal::TEN, 2).await;
        let user = Principal::user("u1");
        let start = Utc::now();

        let r = engine
            .allocate(&user, lot.id, Some(start), Some("KA-01-1234".into()))
            .await
            .unwrap();
        assert_eq!(r.vehicle_number.as_deref(), Some("KA-01-1234"));

        engine.check_in(&user, r.id).await.unwrap();
        let err = engine.check_in(&user, r.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));

        let done = engine
            .check_out(&user, r.id, Some(start + ChronoDuration::minutes(90)))
            .await
            .unwrap();
        assert_eq!(done.cost, Some(Decimal::new(1500, 2)));

        let spots = engine.list_spots(lot.id).await.unwrap();
        assert!(spots.iter().all(|s| s.status == SpotStatus::Available));

        let err = engine.cancel(&user, r.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn other_users_reservation_is_not_found() {
        let engine = engine();
        let lot = lot(&engine, Decimal::TEN, 1).await;
        let r = engine
            .allocate(&Principal::user("u1"), lot.id, None, None)
            .await
            .unwrap();

        let intruder = Principal::user("u2");
        assert!(matches!(
            engine.get_reservation(&intruder, r.id).await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
        assert!(matches!(
            engine.cancel(&intruder, r.id).await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
        assert!(engine.get_reservation(&admin(), r.id).await.is_ok());
    }

    #[tokio::test]
    async fn admin_operations_require_admin() {
        let engine = engine();
        let lot = lot(&engine, Decimal::TEN, 1).await;
        let user = Principal::user("u1");

        for err in [
            engine.grow(&user, lot.id, 1).await.unwrap_err(),
            engine.shrink(&user, lot.id, 1).await.unwrap_err(),
            engine.delete_lot(&user, lot.id).await.unwrap_err(),
            engine
                .create_lot(&user, NewLot::new("x", Decimal::ONE, 1))
                .await
                .unwrap_err(),
            engine.list_all_reservations(&user).await.unwrap_err(),
        ] {
            assert!(matches!(err, DomainError::Unauthorized(_)));
        }
        assert!(matches!(
            engine.list_spots_with_reservations(&user, lot.id).await.unwrap_err(),
            DomainError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn shrink_is_all_or_nothing() {
        let engine = engine();
        let lot = lot(&engine, Decimal::TEN, 3).await;
        engine
            .allocate(&Principal::user("u1"), lot.id, None, None)
            .await
            .unwrap();

        let err = engine.shrink(&admin(), lot.id, 3).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        let view = engine.get_lot(lot.id).await.unwrap();
        assert_eq!(view.lot.capacity, 3);
        assert_eq!(view.spots.total, 3);

        let shrunk = engine.shrink(&admin(), lot.id, 2).await.unwrap();
        assert_eq!(shrunk.capacity, 1);
        let view = engine.get_lot(lot.id).await.unwrap();
        assert_eq!((view.spots.total, view.spots.reserved), (1, 1));
    }

    #[tokio::test]
    async fn resize_dispatches_by_difference() {
        let engine = engine();
        let lot = lot(&engine, Decimal::TEN, 2).await;

        assert_eq!(engine.resize(&admin(), lot.id, 5).await.unwrap().capacity, 5);
        assert_eq!(engine.resize(&admin(), lot.id, 5).await.unwrap().capacity, 5);
        assert_eq!(engine.resize(&admin(), lot.id, 1).await.unwrap().capacity, 1);
        assert_eq!(engine.list_spots(lot.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_lot_blocked_by_occupied_spot() {
        let engine = engine();
        let lot = lot(&engine, Decimal::TEN, 2).await;
        let user = Principal::user("u1");
        let r = engine.allocate(&user, lot.id, None, None).await.unwrap();
        engine.check_in(&user, r.id).await.unwrap();

        let err = engine.delete_lot(&admin(), lot.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        engine.check_out(&user, r.id, None).await.unwrap();
        engine.delete_lot(&admin(), lot.id).await.unwrap();
        assert!(matches!(
            engine.get_lot(lot.id).await.unwrap_err(),
            DomainError::NotFound { .. }
        ));

        // History survives without its spot
        let history = engine.get_reservation(&user, r.id).await.unwrap();
        assert_eq!(history.spot_id, None);
        assert!(history.cost.is_some());
    }

    #[tokio::test]
    async fn committed_changes_are_published() {
        let engine = engine();
        let mut events = engine.event_bus().subscribe();

        let lot = lot(&engine, Decimal::TEN, 1).await;
        engine.grow(&admin(), lot.id, 2).await.unwrap();
        let user = Principal::user("u1");
        let r = engine.allocate(&user, lot.id, None, None).await.unwrap();
        engine.cancel(&user, r.id).await.unwrap();

        let types: Vec<&str> = [
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
            events.recv().await.unwrap(),
        ]
        .iter()
        .map(|m| m.event.event_type())
        .collect();
        assert_eq!(types, ["lot_created", "capacity_changed", "reservation_cancelled"]);
    }

    #[tokio::test]
    async fn failed_operation_publishes_nothing() {
        let engine = engine();
        let lot = lot(&engine, Decimal::TEN, 1).await;
        let mut events = engine.event_bus().subscribe();

        assert!(engine.shrink(&admin(), lot.id, 2).await.is_err());
        engine.grow(&admin(), lot.id, 1).await.unwrap();

        match events.recv().await.unwrap().event {
            Event::CapacityChanged(e) => assert_eq!((e.old_capacity, e.new_capacity), (1, 2)),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn lot_views_carry_counts() {
        let engine = engine();
        let lot = lot(&engine, Decimal::TEN, 2).await;
        let user = Principal::user("u1");
        let r = engine.allocate(&user, lot.id, None, None).await.unwrap();
        engine.check_in(&user, r.id).await.unwrap();

        let views = engine.list_lots().await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].spots.occupied, 1);
        assert_eq!(views[0].spots.available, 1);

        let details = engine
            .list_spots_with_reservations(&admin(), lot.id)
            .await
            .unwrap();
        let held: Vec<_> = details.iter().filter_map(|d| d.reservation.as_ref()).collect();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].id, r.id);
    }

    /// Shrink `removing` spots of a fresh lot while `callers` users allocate
    /// from it, then check the two never handed out the same spots.
    async fn shrink_races_allocations(engine: ParkingEngine, capacity: u32, removing: u32, callers: u32) {
        let lot_id = lot(&engine, Decimal::TEN, capacity).await.id;

        let shrink = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.shrink(&admin(), lot_id, removing).await })
        };
        let mut allocations = Vec::new();
        for i in 0..callers {
            let engine = engine.clone();
            allocations.push(tokio::spawn(async move {
                engine
                    .allocate(&Principal::user(format!("u{}", i)), lot_id, None, None)
                    .await
            }));
        }

        let removed = match shrink.await.unwrap() {
            Ok(shrunk) => {
                assert_eq!(shrunk.capacity, capacity - removing);
                removing
            }
            Err(DomainError::Conflict(_)) => 0,
            Err(e) => panic!("unexpected shrink error: {e}"),
        };
        let mut allocated = 0;
        for handle in allocations {
            match handle.await.unwrap() {
                Ok(_) => allocated += 1,
                Err(DomainError::Conflict(_)) => {}
                Err(e) => panic!("unexpected allocation error: {e}"),
            }
        }

        assert!(removed + allocated <= capacity);
        assert_eq!(allocated, callers.min(capacity - removed));

        let view = engine.get_lot(lot_id).await.unwrap();
        assert_eq!(view.lot.capacity, capacity - removed);
        assert_eq!(view.spots.total, view.lot.capacity);
        assert_eq!(view.spots.reserved, allocated);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shrink_and_allocate_exclude_each_other() {
        for _ in 0..10 {
            shrink_races_allocations(engine(), 8, 5, 8).await;
            shrink_races_allocations(engine(), 6, 6, 6).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shrink_and_allocate_exclude_each_other_on_sqlite() {
        let (engine, db, path) = file_engine().await;
        for _ in 0..3 {
            shrink_races_allocations(engine.clone(), 8, 5, 8).await;
            shrink_races_allocations(engine.clone(), 6, 6, 6).await;
        }
        remove_file_engine(db, path).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocations_across_lots_on_sqlite() {
        const LOTS: u32 = 8;
        const SPOTS: u32 = 20;
        let (engine, db, path) = file_engine().await;

        let mut lot_ids = Vec::new();
        for _ in 0..LOTS {
            lot_ids.push(lot(&engine, Decimal::TEN, SPOTS).await.id);
        }

        let mut handles = Vec::new();
        for (n, lot_id) in lot_ids.iter().copied().enumerate() {
            for i in 0..SPOTS {
                let engine = engine.clone();
                handles.push(tokio::spawn(async move {
                    engine
                        .allocate(&Principal::user(format!("u{}-{}", n, i)), lot_id, None, None)
                        .await
                }));
            }
        }
        for handle in handles {
            if let Err(e) = handle.await.unwrap() {
                panic!("allocation against free capacity failed: {e}");
            }
        }

        for lot_id in lot_ids {
            let view = engine.get_lot(lot_id).await.unwrap();
            assert_eq!((view.spots.reserved, view.spots.available), (SPOTS, 0));
        }
        remove_file_engine(db, path).await;
    }
}
