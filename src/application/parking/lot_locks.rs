//! Per-lot exclusive locks
//!
//! Every read-modify-write of a lot's spot statuses runs under that lot's
//! guard, so allocation and admin resizing never interleave on one lot.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use crate::domain::{DomainError, DomainResult};

pub struct LotLocks {
    locks: DashMap<i32, Arc<Mutex<()>>>,
    timeout: Duration,
}

/// Held for the duration of one lot operation.
#[derive(Debug)]
pub struct LotGuard {
    pub lot_id: i32,
    _guard: OwnedMutexGuard<()>,
}

impl LotLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    /// Wait for the lot's lock, bounded by the configured timeout.
    /// A timeout is a retryable `Conflict`.
    pub async fn acquire(&self, lot_id: i32) -> DomainResult<LotGuard> {
        // Clone the Arc out so the map shard is not held across the await.
        let lock = self
            .locks
            .entry(lot_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(LotGuard {
                lot_id,
                _guard: guard,
            }),
            Err(_) => {
                warn!(lot_id, timeout_ms = self.timeout.as_millis() as u64, "Lot lock wait timed out");
                Err(DomainError::Conflict(format!(
                    "lot {} is busy, retry later",
                    lot_id
                )))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_waits_then_times_out() {
        let locks = LotLocks::new(Duration::from_millis(20));
        let _held = locks.acquire(1).await.unwrap();

        let err = locks.acquire(1).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn different_lots_do_not_contend() {
        let locks = LotLocks::new(Duration::from_millis(20));
        let _a = locks.acquire(1).await.unwrap();
        let b = locks.acquire(2).await.unwrap();
        assert_eq!(b.lot_id, 2);
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_lock_can_be_taken_again() {
        let locks = LotLocks::new(Duration::from_millis(20));
        drop(locks.acquire(1).await.unwrap());
        assert!(locks.acquire(1).await.is_ok());
    }
}
