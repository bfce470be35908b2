//! SeaORM implementation of SpotRepository

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::domain::{
    DomainError, DomainResult, Spot, SpotRepository, SpotStatus, SpotStatusCounts,
};
use crate::infrastructure::database::entities::spot;

pub struct SeaOrmSpotRepository {
    db: DatabaseConnection,
}

impl SeaOrmSpotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(super) fn parse_status(raw: &str) -> DomainResult<SpotStatus> {
    SpotStatus::parse(raw)
        .ok_or_else(|| DomainError::Storage(format!("unknown spot status '{}'", raw)))
}

pub(super) fn model_to_domain(m: spot::Model) -> DomainResult<Spot> {
    Ok(Spot {
        id: m.id,
        lot_id: m.lot_id,
        status: parse_status(&m.status)?,
    })
}

fn models_to_domain(models: Vec<spot::Model>) -> DomainResult<Vec<Spot>> {
    models.into_iter().map(model_to_domain).collect()
}

/// Conditional status write shared by every repository that moves a spot.
///
/// Succeeds only if the row still holds `expected`.
pub(super) async fn cas_spot<C: ConnectionTrait>(
    conn: &C,
    spot_id: i32,
    expected: SpotStatus,
    next: SpotStatus,
) -> DomainResult<()> {
    let res = spot::Entity::update_many()
        .col_expr(spot::Column::Status, Expr::value(next.as_str()))
        .col_expr(spot::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(spot::Column::Id.eq(spot_id))
        .filter(spot::Column::Status.eq(expected.as_str()))
        .exec(conn)
        .await?;

    if res.rows_affected == 1 {
        debug!("Spot {} moved {} -> {}", spot_id, expected, next);
        return Ok(());
    }

    match spot::Entity::find_by_id(spot_id).one(conn).await? {
        None => Err(DomainError::not_found("Spot", spot_id)),
        Some(current) => Err(DomainError::Conflict(format!(
            "spot {} is {}, expected {}",
            spot_id, current.status, expected
        ))),
    }
}

// ── SpotRepository impl ─────────────────────────────────────────

#[async_trait]
impl SpotRepository for SeaOrmSpotRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Spot>> {
        spot::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_lot(&self, lot_id: i32) -> DomainResult<Vec<Spot>> {
        let models = spot::Entity::find()
            .filter(spot::Column::LotId.eq(lot_id))
            .order_by_asc(spot::Column::Id)
            .all(&self.db)
            .await?;
        models_to_domain(models)
    }

    async fn find_available(&self, lot_id: i32, limit: u32) -> DomainResult<Vec<Spot>> {
        let models = spot::Entity::find()
            .filter(spot::Column::LotId.eq(lot_id))
            .filter(spot::Column::Status.eq(SpotStatus::Available.as_str()))
            .order_by_asc(spot::Column::Id)
            .limit(u64::from(limit))
            .all(&self.db)
            .await?;
        models_to_domain(models)
    }

    async fn status_counts(&self, lot_id: i32) -> DomainResult<SpotStatusCounts> {
        // One statement, so the tally is a consistent snapshot.
        let statuses: Vec<String> = spot::Entity::find()
            .select_only()
            .column(spot::Column::Status)
            .filter(spot::Column::LotId.eq(lot_id))
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut counts = SpotStatusCounts::default();
        for raw in &statuses {
            counts.record(parse_status(raw)?);
        }
        Ok(counts)
    }

    async fn compare_and_set_status(
        &self,
        spot_id: i32,
        expected: SpotStatus,
        next: SpotStatus,
    ) -> DomainResult<Spot> {
        cas_spot(&self.db, spot_id, expected, next).await?;
        self.find_by_id(spot_id)
            .await?
            .ok_or(DomainError::not_found("Spot", spot_id))
    }
}
