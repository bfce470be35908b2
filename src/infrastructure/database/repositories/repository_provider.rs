//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::repositories::RepositoryProvider;
use crate::domain::{LotRepository, ReservationRepository, SpotRepository};

use super::lot_repository::SeaOrmLotRepository;
use super::reservation_repository::SeaOrmReservationRepository;
use super::spot_repository::SeaOrmSpotRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let lot = repos.lots().find_by_id(1).await?;
/// let counts = repos.spots().status_counts(1).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    lots: SeaOrmLotRepository,
    spots: SeaOrmSpotRepository,
    reservations: SeaOrmReservationRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            lots: SeaOrmLotRepository::new(db.clone()),
            spots: SeaOrmSpotRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            db,
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn lots(&self) -> &dyn LotRepository {
        &self.lots
    }

    fn spots(&self) -> &dyn SpotRepository {
        &self.spots
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::domain::{DomainError, NewLot, NewReservation, ReservationState, SpotStatus};
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::{init_database, DatabaseConfig};

    async fn provider() -> SeaOrmRepositoryProvider {
        let db = init_database(&DatabaseConfig::sqlite_memory()).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmRepositoryProvider::new(db)
    }

    fn claim(user: &str, spot_id: i32) -> NewReservation {
        NewReservation {
            user_id: user.into(),
            spot_id,
            vehicle_number: Some("KA-01-1234".into()),
            start_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lot_is_created_with_its_spots() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::new(1250, 2), 5))
            .await
            .unwrap();

        assert_eq!(lot.capacity, 5);
        assert_eq!(lot.hourly_price, Decimal::new(1250, 2));

        let counts = repos.spots().status_counts(lot.id).await.unwrap();
        assert_eq!(counts.available, 5);
        assert_eq!(counts.total, 5);
    }

    #[tokio::test]
    async fn large_lot_spans_insert_batches() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Stadium", Decimal::ONE, 700))
            .await
            .unwrap();
        assert_eq!(repos.spots().find_by_lot(lot.id).await.unwrap().len(), 700);
    }

    #[tokio::test]
    async fn claim_is_refused_when_spot_taken() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::ONE, 1))
            .await
            .unwrap();
        let spot = repos.spots().find_by_lot(lot.id).await.unwrap()[0].clone();

        let first = repos
            .reservations()
            .create_claiming_spot(claim("u1", spot.id))
            .await
            .unwrap();
        assert_eq!(first.state, ReservationState::Active);

        let err = repos
            .reservations()
            .create_claiming_spot(claim("u2", spot.id))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(repos.reservations().find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn complete_records_cost_and_frees_spot() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::TEN, 1))
            .await
            .unwrap();
        let spot = repos.spots().find_by_lot(lot.id).await.unwrap()[0].clone();
        let mut new = claim("u1", spot.id);
        new.start_time = Utc::now() - Duration::hours(2);
        let r = repos.reservations().create_claiming_spot(new).await.unwrap();
        repos
            .spots()
            .compare_and_set_status(spot.id, SpotStatus::Reserved, SpotStatus::Occupied)
            .await
            .unwrap();

        let done = repos
            .reservations()
            .complete_releasing_spot(r.id, Utc::now(), Decimal::new(2000, 2))
            .await
            .unwrap();
        assert_eq!(done.state, ReservationState::Completed);

        let stored = repos.reservations().find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(stored.cost, Some(Decimal::new(2000, 2)));
        assert!(stored.end_time.is_some());

        let spot = repos.spots().find_by_id(spot.id).await.unwrap().unwrap();
        assert_eq!(spot.status, SpotStatus::Available);
    }

    #[tokio::test]
    async fn complete_on_reserved_spot_rolls_back() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::ONE, 1))
            .await
            .unwrap();
        let spot = repos.spots().find_by_lot(lot.id).await.unwrap()[0].clone();
        let r = repos
            .reservations()
            .create_claiming_spot(claim("u1", spot.id))
            .await
            .unwrap();

        let err = repos
            .reservations()
            .complete_releasing_spot(r.id, Utc::now(), Decimal::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let stored = repos.reservations().find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(stored.state, ReservationState::Active);
    }

    #[tokio::test]
    async fn delete_removes_record_and_releases_spot() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::ONE, 1))
            .await
            .unwrap();
        let spot = repos.spots().find_by_lot(lot.id).await.unwrap()[0].clone();
        let r = repos
            .reservations()
            .create_claiming_spot(claim("u1", spot.id))
            .await
            .unwrap();

        let snapshot = repos.reservations().delete_releasing_spot(r.id).await.unwrap();
        assert_eq!(snapshot.state, ReservationState::Cancelled);
        assert!(repos.reservations().find_by_id(r.id).await.unwrap().is_none());
        assert_eq!(
            repos.spots().status_counts(lot.id).await.unwrap().available,
            1
        );
    }

    #[tokio::test]
    async fn shrink_removes_lowest_available_and_keeps_history() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::ONE, 3))
            .await
            .unwrap();
        let spots = repos.spots().find_by_lot(lot.id).await.unwrap();

        // Completed reservation on the first spot leaves it Available
        let r = repos
            .reservations()
            .create_claiming_spot(claim("u1", spots[0].id))
            .await
            .unwrap();
        repos
            .spots()
            .compare_and_set_status(spots[0].id, SpotStatus::Reserved, SpotStatus::Occupied)
            .await
            .unwrap();
        repos
            .reservations()
            .complete_releasing_spot(r.id, Utc::now(), Decimal::ZERO)
            .await
            .unwrap();

        let (lot, removed) = repos.lots().remove_available_spots(lot.id, 2).await.unwrap();
        assert_eq!(removed, vec![spots[0].id, spots[1].id]);
        assert_eq!(lot.capacity, 1);

        let history = repos.reservations().find_by_id(r.id).await.unwrap().unwrap();
        assert_eq!(history.spot_id, None);
        assert_eq!(history.state, ReservationState::Completed);
    }

    #[tokio::test]
    async fn shrink_beyond_available_changes_nothing() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::ONE, 2))
            .await
            .unwrap();
        let spot = repos.spots().find_by_lot(lot.id).await.unwrap()[0].clone();
        repos
            .reservations()
            .create_claiming_spot(claim("u1", spot.id))
            .await
            .unwrap();

        let err = repos.lots().remove_available_spots(lot.id, 2).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let lot = repos.lots().find_by_id(lot.id).await.unwrap().unwrap();
        assert_eq!(lot.capacity, 2);
        assert_eq!(repos.spots().find_by_lot(lot.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_cascade_refuses_lot_in_use() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::ONE, 2))
            .await
            .unwrap();
        let spot = repos.spots().find_by_lot(lot.id).await.unwrap()[0].clone();
        let r = repos
            .reservations()
            .create_claiming_spot(claim("u1", spot.id))
            .await
            .unwrap();

        let err = repos.lots().delete_cascade(lot.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        repos.reservations().delete_releasing_spot(r.id).await.unwrap();
        repos.lots().delete_cascade(lot.id).await.unwrap();
        assert!(repos.lots().find_by_id(lot.id).await.unwrap().is_none());
        assert!(repos.spots().find_by_lot(lot.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn grow_appends_available_spots() {
        let repos = provider().await;
        let lot = repos
            .lots()
            .create_with_spots(NewLot::new("Central", Decimal::ONE, 0))
            .await
            .unwrap();
        let lot = repos.lots().add_spots(lot.id, 3).await.unwrap();
        assert_eq!(lot.capacity, 3);
        assert_eq!(repos.spots().find_available(lot.id, 10).await.unwrap().len(), 3);

        let err = repos.lots().add_spots(999, 1).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
