//! Lot repository interface
//!
//! Every method that touches spot rows runs as one storage transaction.

use async_trait::async_trait;

use super::model::{Lot, NewLot};
use crate::domain::DomainResult;

#[async_trait]
pub trait LotRepository: Send + Sync {
    /// Insert the lot together with `capacity` Available spots.
    async fn create_with_spots(&self, lot: NewLot) -> DomainResult<Lot>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Lot>>;

    async fn find_all(&self) -> DomainResult<Vec<Lot>>;

    /// Append `count` Available spots and bump capacity.
    async fn add_spots(&self, lot_id: i32, count: u32) -> DomainResult<Lot>;

    /// Delete exactly `count` Available spots, lowest id first, and lower
    /// capacity. Conflict without any change if fewer are Available.
    /// Reservations referencing removed spots keep their row with a null spot.
    ///
    /// Returns the updated lot and the removed spot ids.
    async fn remove_available_spots(&self, lot_id: i32, count: u32)
        -> DomainResult<(Lot, Vec<i32>)>;

    /// Delete all spots and the lot. Conflict if any spot is in use.
    /// Returns the lot as it was before deletion.
    async fn delete_cascade(&self, lot_id: i32) -> DomainResult<Lot>;
}
