//! In-memory reservation repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::parking_lot::LotId;
use crate::domain::reservation::{ReleaseReason, Reservation, ReservationId, ReservationRepository};
use crate::shared::errors::{DomainError, DomainResult};

/// In-memory [`ReservationRepository`].
///
/// State transitions happen through `DashMap::get_mut`, whose shard write
/// lock is the exclusive region for a single reservation id.
pub struct InMemoryReservationRepository {
    reservations: DashMap<ReservationId, Reservation>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self {
            reservations: DashMap::new(),
        }
    }
}

impl Default for InMemoryReservationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn save(&self, reservation: Reservation) -> DomainResult<()> {
        match self.reservations.entry(reservation.id) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "reservation {} already exists",
                reservation.id
            ))),
            Entry::Vacant(entry) => {
                entry.insert(reservation);
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: ReservationId) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(&id).map(|r| r.clone()))
    }

    async fn mark_released(
        &self,
        id: ReservationId,
        reason: ReleaseReason,
        at: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let mut reservation = self
            .reservations
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Reservation", "id", id))?;
        reservation.release(reason, at)?;
        Ok(reservation.clone())
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.is_overdue(now))
            .map(|r| r.clone())
            .collect())
    }

    async fn count_active_for_lot(&self, lot_id: LotId) -> DomainResult<usize> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.lot_id == lot_id && r.is_active())
            .count())
    }
}

// ── Tests ──────────────────────────────────────────────────────
