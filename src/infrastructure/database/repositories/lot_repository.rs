//! SeaORM implementation of LotRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::domain::billing::{from_cents, to_cents};
use crate::domain::{DomainError, DomainResult, Lot, LotRepository, NewLot, SpotStatus};
use crate::infrastructure::database::entities::{lot, reservation, spot};

/// Rows per INSERT, well under SQLite's bound-parameter limit.
const SPOT_INSERT_BATCH: usize = 300;

pub struct SeaOrmLotRepository {
    db: DatabaseConnection,
}

impl SeaOrmLotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: lot::Model) -> DomainResult<Lot> {
    let capacity = u32::try_from(m.capacity).map_err(|_| {
        DomainError::Storage(format!("lot {} has invalid capacity {}", m.id, m.capacity))
    })?;
    Ok(Lot {
        id: m.id,
        name: m.name,
        address: m.address,
        pin_code: m.pin_code,
        hourly_price: from_cents(m.hourly_price_cents),
        capacity,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

async fn require_lot<C: ConnectionTrait>(conn: &C, lot_id: i32) -> DomainResult<lot::Model> {
    lot::Entity::find_by_id(lot_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("Lot", lot_id))
}

async fn insert_spots<C: ConnectionTrait>(
    conn: &C,
    lot_id: i32,
    count: u32,
    now: DateTime<Utc>,
) -> DomainResult<()> {
    let rows: Vec<spot::ActiveModel> = (0..count)
        .map(|_| spot::ActiveModel {
            id: NotSet,
            lot_id: Set(lot_id),
            status: Set(SpotStatus::Available.as_str().to_string()),
            updated_at: Set(now),
        })
        .collect();

    for chunk in rows.chunks(SPOT_INSERT_BATCH) {
        spot::Entity::insert_many(chunk.to_vec()).exec(conn).await?;
    }
    Ok(())
}

async fn set_capacity<C: ConnectionTrait>(
    conn: &C,
    model: lot::Model,
    capacity: i64,
) -> DomainResult<lot::Model> {
    let capacity = i32::try_from(capacity)
        .map_err(|_| DomainError::InvalidInput(format!("capacity {} out of range", capacity)))?;
    let mut active: lot::ActiveModel = model.into();
    active.capacity = Set(capacity);
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

/// Keep reservation history when its spot goes away.
async fn detach_reservations<C: ConnectionTrait>(conn: &C, spot_ids: &[i32]) -> DomainResult<()> {
    if spot_ids.is_empty() {
        return Ok(());
    }
    reservation::Entity::update_many()
        .col_expr(reservation::Column::SpotId, Expr::value(Option::<i32>::None))
        .filter(reservation::Column::SpotId.is_in(spot_ids.to_vec()))
        .exec(conn)
        .await?;
    Ok(())
}

// ── LotRepository impl ──────────────────────────────────────────

#[async_trait]
impl LotRepository for SeaOrmLotRepository {
    async fn create_with_spots(&self, new: NewLot) -> DomainResult<Lot> {
        debug!("Creating lot '{}' with {} spots", new.name, new.capacity);

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let model = lot::ActiveModel {
            id: NotSet,
            name: Set(new.name),
            address: Set(new.address),
            pin_code: Set(new.pin_code),
            hourly_price_cents: Set(to_cents(new.hourly_price)?),
            capacity: Set(i32::try_from(new.capacity).map_err(|_| {
                DomainError::InvalidInput(format!("capacity {} out of range", new.capacity))
            })?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        insert_spots(&txn, model.id, new.capacity, now).await?;
        txn.commit().await?;

        model_to_domain(model)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Lot>> {
        let model = lot::Entity::find_by_id(id).one(&self.db).await?;
        model.map(model_to_domain).transpose()
    }

    async fn find_all(&self) -> DomainResult<Vec<Lot>> {
        let models = lot::Entity::find()
            .order_by_asc(lot::Column::Id)
            .all(&self.db)
            .await?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn add_spots(&self, lot_id: i32, count: u32) -> DomainResult<Lot> {
        debug!("Adding {} spots to lot {}", count, lot_id);

        let txn = self.db.begin().await?;
        let model = require_lot(&txn, lot_id).await?;
        insert_spots(&txn, lot_id, count, Utc::now()).await?;

        let capacity = i64::from(model.capacity) + i64::from(count);
        let model = set_capacity(&txn, model, capacity).await?;
        txn.commit().await?;

        model_to_domain(model)
    }

    async fn remove_available_spots(
        &self,
        lot_id: i32,
        count: u32,
    ) -> DomainResult<(Lot, Vec<i32>)> {
        debug!("Removing {} available spots from lot {}", count, lot_id);

        let txn = self.db.begin().await?;
        let model = require_lot(&txn, lot_id).await?;

        let victims: Vec<i32> = spot::Entity::find()
            .select_only()
            .column(spot::Column::Id)
            .filter(spot::Column::LotId.eq(lot_id))
            .filter(spot::Column::Status.eq(SpotStatus::Available.as_str()))
            .order_by_asc(spot::Column::Id)
            .limit(u64::from(count))
            .into_tuple()
            .all(&txn)
            .await?;

        if victims.len() < count as usize {
            return Err(DomainError::Conflict(format!(
                "not enough available spots: requested {}, available {}",
                count,
                victims.len()
            )));
        }

        detach_reservations(&txn, &victims).await?;
        let deleted = spot::Entity::delete_many()
            .filter(spot::Column::Id.is_in(victims.clone()))
            .filter(spot::Column::Status.eq(SpotStatus::Available.as_str()))
            .exec(&txn)
            .await?;
        if deleted.rows_affected != victims.len() as u64 {
            // A spot was claimed between the scan and the delete; drop the txn.
            return Err(DomainError::Conflict(
                "spot availability changed during shrink, retry".into(),
            ));
        }

        let capacity = i64::from(model.capacity) - i64::from(count);
        let model = set_capacity(&txn, model, capacity).await?;
        txn.commit().await?;

        Ok((model_to_domain(model)?, victims))
    }

    async fn delete_cascade(&self, lot_id: i32) -> DomainResult<Lot> {
        debug!("Deleting lot {}", lot_id);

        let txn = self.db.begin().await?;
        let model = require_lot(&txn, lot_id).await?;

        let in_use = spot::Entity::find()
            .filter(spot::Column::LotId.eq(lot_id))
            .filter(spot::Column::Status.ne(SpotStatus::Available.as_str()))
            .count(&txn)
            .await?;
        if in_use > 0 {
            return Err(DomainError::Conflict(format!(
                "cannot delete lot {}: {} spots are reserved or occupied",
                lot_id, in_use
            )));
        }

        let spot_ids: Vec<i32> = spot::Entity::find()
            .select_only()
            .column(spot::Column::Id)
            .filter(spot::Column::LotId.eq(lot_id))
            .into_tuple()
            .all(&txn)
            .await?;

        detach_reservations(&txn, &spot_ids).await?;
        let deleted = spot::Entity::delete_many()
            .filter(spot::Column::LotId.eq(lot_id))
            .filter(spot::Column::Status.eq(SpotStatus::Available.as_str()))
            .exec(&txn)
            .await?;
        if deleted.rows_affected != spot_ids.len() as u64 {
            return Err(DomainError::Conflict(
                "spot availability changed during lot deletion, retry".into(),
            ));
        }

        lot::Entity::delete_by_id(lot_id).exec(&txn).await?;
        txn.commit().await?;

        model_to_domain(model)
    }
}
