//! Lot creation, resizing and deletion (admin side)

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::lot_locks::LotLocks;
use super::spot_registry::SpotRegistry;
use crate::application::events::{
    CapacityChange, CapacityChangedEvent, Event, LotSnapshot, SharedEventBus,
};
use crate::domain::{
    DomainResult, Lot, NewLot, Principal, RepositoryProvider, SpotStatusCounts,
};

/// A lot with its current spot status distribution.
#[derive(Debug, Clone)]
pub struct LotView {
    pub lot: Lot,
    pub spots: SpotStatusCounts,
}

pub struct CapacityManager {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<SpotRegistry>,
    locks: Arc<LotLocks>,
    event_bus: SharedEventBus,
}

impl CapacityManager {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        registry: Arc<SpotRegistry>,
        locks: Arc<LotLocks>,
        event_bus: SharedEventBus,
    ) -> Self {
        Self {
            repos,
            registry,
            locks,
            event_bus,
        }
    }

    pub async fn create_lot(&self, principal: &Principal, new: NewLot) -> DomainResult<Lot> {
        principal.require_admin("create lots")?;
        new.validate()?;

        let lot = self.repos.lots().create_with_spots(new).await?;
        info!(lot_id = lot.id, name = %lot.name, capacity = lot.capacity, "Lot created");
        self.event_bus.publish(Event::LotCreated(LotSnapshot::from(&lot)));
        Ok(lot)
    }

    pub async fn get_lot(&self, lot_id: i32) -> DomainResult<LotView> {
        let lot = self.registry.require_lot(lot_id).await?;
        let spots = self.repos.spots().status_counts(lot_id).await?;
        Ok(LotView { lot, spots })
    }

    pub async fn list_lots(&self) -> DomainResult<Vec<LotView>> {
        let lots = self.repos.lots().find_all().await?;
        let mut views = Vec::with_capacity(lots.len());
        for lot in lots {
            let spots = self.repos.spots().status_counts(lot.id).await?;
            views.push(LotView { lot, spots });
        }
        Ok(views)
    }

    pub async fn grow(&self, principal: &Principal, lot_id: i32, extra: u32) -> DomainResult<Lot> {
        principal.require_admin("resize lots")?;
        self.registry.require_lot(lot_id).await?;
        let _guard = self.locks.acquire(lot_id).await?;
        self.grow_locked(lot_id, extra).await
    }

    pub async fn shrink(&self, principal: &Principal, lot_id: i32, count: u32) -> DomainResult<Lot> {
        principal.require_admin("resize lots")?;
        self.registry.require_lot(lot_id).await?;
        let _guard = self.locks.acquire(lot_id).await?;
        self.shrink_locked(lot_id, count).await
    }

    /// Grow or shrink to `target` spots. Equal capacity is a no-op.
    pub async fn resize(&self, principal: &Principal, lot_id: i32, target: u32) -> DomainResult<Lot> {
        principal.require_admin("resize lots")?;
        self.registry.require_lot(lot_id).await?;
        let _guard = self.locks.acquire(lot_id).await?;

        let lot = self.registry.require_lot(lot_id).await?;
        match target.cmp(&lot.capacity) {
            Ordering::Equal => Ok(lot),
            Ordering::Greater => self.grow_locked(lot_id, target - lot.capacity).await,
            Ordering::Less => self.shrink_locked(lot_id, lot.capacity - target).await,
        }
    }

    pub async fn delete_lot(&self, principal: &Principal, lot_id: i32) -> DomainResult<Lot> {
        principal.require_admin("delete lots")?;
        self.registry.require_lot(lot_id).await?;
        let lot = {
            let _guard = self.locks.acquire(lot_id).await?;
            self.repos.lots().delete_cascade(lot_id).await?
        };

        info!(lot_id, spots_removed = lot.capacity, "Lot deleted");
        self.event_bus.publish(Event::LotDeleted(LotSnapshot::from(&lot)));
        Ok(lot)
    }

    async fn grow_locked(&self, lot_id: i32, extra: u32) -> DomainResult<Lot> {
        let old = self.registry.require_lot(lot_id).await?.capacity;
        let lot = self.registry.create_spots(lot_id, extra).await?;
        self.capacity_changed(&lot, CapacityChange::Grow, old, Vec::new());
        Ok(lot)
    }

    async fn shrink_locked(&self, lot_id: i32, count: u32) -> DomainResult<Lot> {
        let old = self.registry.require_lot(lot_id).await?.capacity;
        let (lot, removed) = self.registry.remove_available_spots(lot_id, count).await?;
        self.capacity_changed(&lot, CapacityChange::Shrink, old, removed);
        Ok(lot)
    }

    fn capacity_changed(
        &self,
        lot: &Lot,
        change: CapacityChange,
        old_capacity: u32,
        removed_spot_ids: Vec<i32>,
    ) {
        let kind = match change {
            CapacityChange::Grow => "grow",
            CapacityChange::Shrink => "shrink",
        };
        metrics::counter!("parking_capacity_changes_total", "kind" => kind).increment(1);
        self.event_bus.publish(Event::CapacityChanged(CapacityChangedEvent {
            lot_id: lot.id,
            change,
            old_capacity,
            new_capacity: lot.capacity,
            removed_spot_ids,
            timestamp: Utc::now(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::application::events::create_event_bus;
    use crate::domain::DomainError;
    use crate::infrastructure::InMemoryStorage;

    fn manager() -> (CapacityManager, Arc<LotLocks>) {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryStorage::new());
        let registry = Arc::new(SpotRegistry::new(repos.clone()));
        let locks = Arc::new(LotLocks::new(Duration::from_secs(1)));
        let manager = CapacityManager::new(repos, registry, locks.clone(), create_event_bus(16));
        (manager, locks)
    }

    #[tokio::test]
    async fn unknown_lot_leaves_no_lock_entry() {
        let (manager, locks) = manager();
        let admin = Principal::admin("admin");

        for err in [
            manager.grow(&admin, 404, 1).await.unwrap_err(),
            manager.shrink(&admin, 404, 1).await.unwrap_err(),
            manager.resize(&admin, 404, 3).await.unwrap_err(),
            manager.delete_lot(&admin, 404).await.unwrap_err(),
        ] {
            assert!(matches!(err, DomainError::NotFound { .. }));
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn known_lot_is_locked_once() {
        let (manager, locks) = manager();
        let admin = Principal::admin("admin");
        let lot = manager
            .create_lot(&admin, NewLot::new("Central", Decimal::TEN, 1))
            .await
            .unwrap();

        manager.grow(&admin, lot.id, 2).await.unwrap();
        manager.shrink(&admin, lot.id, 1).await.unwrap();
        assert_eq!(locks.len(), 1);
    }
}
