//! Lot store interface

use async_trait::async_trait;

use super::model::{LotId, ParkingLot};
use crate::shared::errors::DomainResult;

/// Authoritative mapping from lot id to lot record.
///
/// New lots are written in two steps: [`insert_pending`](Self::insert_pending)
/// stores a record that no read can observe, and [`commit`](Self::commit)
/// publishes it. This lets lot creation span the store and the geo index
/// without either one exposing a half-created lot.
#[async_trait]
pub trait LotStore: Send + Sync {
    /// Generate the next lot id
    async fn next_id(&self) -> LotId;

    /// Stage a lot that stays invisible until committed
    async fn insert_pending(&self, lot: ParkingLot) -> DomainResult<()>;

    /// Publish a staged lot
    async fn commit(&self, id: LotId) -> DomainResult<()>;

    /// Drop a staged lot. Committed lots are left untouched.
    async fn discard(&self, id: LotId) -> DomainResult<()>;

    /// Find a committed lot by id, `NotFound` otherwise
    async fn get(&self, id: LotId) -> DomainResult<ParkingLot>;

    /// Committed lots in the order of `ids`; unknown ids are skipped
    async fn get_many(&self, ids: &[LotId]) -> DomainResult<Vec<ParkingLot>>;

    /// Take one spot if any is available.
    ///
    /// Returns `Ok(false)` without mutation when the lot is full.
    async fn try_decrement_available(&self, id: LotId) -> DomainResult<bool>;

    /// Return one spot, never exceeding the lot's capacity
    async fn increment_available(&self, id: LotId) -> DomainResult<()>;

    /// Number of committed lots
    async fn count(&self) -> usize;
}
