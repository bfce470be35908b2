//! Spot repository interface

use async_trait::async_trait;

use super::model::{Spot, SpotStatus, SpotStatusCounts};
use crate::domain::DomainResult;

#[async_trait]
pub trait SpotRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Spot>>;

    /// All spots of a lot ordered by id
    async fn find_by_lot(&self, lot_id: i32) -> DomainResult<Vec<Spot>>;

    /// Up to `limit` Available spots of a lot, lowest id first
    async fn find_available(&self, lot_id: i32, limit: u32) -> DomainResult<Vec<Spot>>;

    async fn status_counts(&self, lot_id: i32) -> DomainResult<SpotStatusCounts>;

    /// Compare-and-set: writes `next` only if the stored status is still
    /// `expected`, otherwise Conflict and nothing changes.
    async fn compare_and_set_status(
        &self,
        spot_id: i32,
        expected: SpotStatus,
        next: SpotStatus,
    ) -> DomainResult<Spot>;
}
