//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use super::spot_repository::cas_spot;
use crate::domain::billing::{from_cents, to_cents};
use crate::domain::{
    DomainError, DomainResult, NewReservation, Reservation, ReservationRepository,
    ReservationState, SpotStatus,
};
use crate::infrastructure::database::entities::reservation;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    let state = ReservationState::parse(&m.state)
        .ok_or_else(|| DomainError::Storage(format!("unknown reservation state '{}'", m.state)))?;
    Ok(Reservation {
        id: m.id,
        user_id: m.user_id,
        spot_id: m.spot_id,
        vehicle_number: m.vehicle_number,
        start_time: m.start_time,
        end_time: m.end_time,
        cost: m.cost_cents.map(from_cents),
        state,
        created_at: m.created_at,
    })
}

fn models_to_domain(models: Vec<reservation::Model>) -> DomainResult<Vec<Reservation>> {
    models.into_iter().map(model_to_domain).collect()
}

fn active_only() -> sea_orm::sea_query::SimpleExpr {
    reservation::Column::State.eq(ReservationState::Active.as_str())
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn create_claiming_spot(&self, new: NewReservation) -> DomainResult<Reservation> {
        debug!("Claiming spot {} for user {}", new.spot_id, new.user_id);

        let txn = self.db.begin().await?;

        let live = reservation::Entity::find()
            .filter(reservation::Column::SpotId.eq(new.spot_id))
            .filter(active_only())
            .count(&txn)
            .await?;
        if live > 0 {
            return Err(DomainError::Conflict(format!(
                "spot {} already has an active reservation",
                new.spot_id
            )));
        }

        cas_spot(&txn, new.spot_id, SpotStatus::Available, SpotStatus::Reserved).await?;

        let model = reservation::ActiveModel {
            id: NotSet,
            user_id: Set(new.user_id),
            spot_id: Set(Some(new.spot_id)),
            vehicle_number: Set(new.vehicle_number),
            start_time: Set(new.start_time),
            end_time: Set(None),
            cost_cents: Set(None),
            state: Set(ReservationState::Active.as_str().to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        model_to_domain(model)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .order_by_desc(reservation::Column::Id)
            .all(&self.db)
            .await?;
        models_to_domain(models)
    }

    async fn find_all(&self) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .order_by_desc(reservation::Column::Id)
            .all(&self.db)
            .await?;
        models_to_domain(models)
    }

    async fn find_active_for_spot(&self, spot_id: i32) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::SpotId.eq(spot_id))
            .filter(active_only())
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn complete_releasing_spot(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        cost: Decimal,
    ) -> DomainResult<Reservation> {
        debug!("Completing reservation {}", id);

        let txn = self.db.begin().await?;
        let model = reservation::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(DomainError::not_found("Reservation", id))?;
        let mut reservation = model_to_domain(model)?;
        reservation.complete(end_time, cost)?;

        let updated = reservation::Entity::update_many()
            .col_expr(
                reservation::Column::State,
                Expr::value(ReservationState::Completed.as_str()),
            )
            .col_expr(reservation::Column::EndTime, Expr::value(end_time))
            .col_expr(reservation::Column::CostCents, Expr::value(to_cents(cost)?))
            .filter(reservation::Column::Id.eq(id))
            .filter(active_only())
            .exec(&txn)
            .await?;
        if updated.rows_affected != 1 {
            return Err(DomainError::InvalidTransition(format!(
                "reservation {} is no longer active",
                id
            )));
        }

        if let Some(spot_id) = reservation.spot_id {
            cas_spot(&txn, spot_id, SpotStatus::Occupied, SpotStatus::Available).await?;
        }

        txn.commit().await?;
        Ok(reservation)
    }

    async fn delete_releasing_spot(&self, id: i32) -> DomainResult<Reservation> {
        debug!("Deleting reservation {}", id);

        let txn = self.db.begin().await?;
        let model = reservation::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(DomainError::not_found("Reservation", id))?;
        let mut reservation = model_to_domain(model)?;
        reservation.cancel()?;

        if let Some(spot_id) = reservation.spot_id {
            cas_spot(&txn, spot_id, SpotStatus::Reserved, SpotStatus::Available).await?;
        }

        let deleted = reservation::Entity::delete_many()
            .filter(reservation::Column::Id.eq(id))
            .filter(active_only())
            .exec(&txn)
            .await?;
        if deleted.rows_affected != 1 {
            return Err(DomainError::InvalidTransition(format!(
                "reservation {} is no longer active",
                id
            )));
        }

        txn.commit().await?;
        Ok(reservation)
    }
}
