//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{ReleaseReason, Reservation, ReservationId};
use crate::domain::parking_lot::LotId;
use crate::shared::errors::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Save a new reservation; an existing id is a `Conflict`
    async fn save(&self, reservation: Reservation) -> DomainResult<()>;

    /// Find reservation by ID
    async fn find_by_id(&self, id: ReservationId) -> DomainResult<Option<Reservation>>;

    /// Transition a reservation to RELEASED under an exclusive region keyed
    /// by its id and return the updated record.
    ///
    /// `NotFound` for unknown ids, `Conflict` when already released.
    async fn mark_released(
        &self,
        id: ReservationId,
        reason: ReleaseReason,
        at: DateTime<Utc>,
    ) -> DomainResult<Reservation>;

    /// Active reservations whose expiry time is at or before `now`
    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;

    /// Number of active reservations held at a lot
    async fn count_active_for_lot(&self, lot_id: LotId) -> DomainResult<usize>;
}
