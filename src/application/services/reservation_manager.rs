//! Spot allocation and release
//!
//! A reservation takes a spot through the lot store's per-lot decrement
//! before any record exists. The capacity check and the capacity change are
//! the same atomic step, so concurrent requests cannot oversell a lot and no
//! wider lock is needed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::{
    DomainError, LotId, LotStore, ReleaseReason, Reservation, ReservationId,
    ReservationRepository, ReserveOutcome,
};
use crate::shared::errors::DomainResult;

/// Key for idempotent retries: `(username, request token)`.
type RequestKey = (String, String);

/// Reservation granted for a request token, if any yet.
type TokenSlot = Arc<Mutex<Option<ReservationId>>>;

pub struct ReservationManager {
    lots: Arc<dyn LotStore>,
    reservations: Arc<dyn ReservationRepository>,
    hold_ttl: Option<Duration>,
    request_tokens: DashMap<RequestKey, TokenSlot>,
}

impl ReservationManager {
    pub fn new(lots: Arc<dyn LotStore>, reservations: Arc<dyn ReservationRepository>) -> Self {
        Self {
            lots,
            reservations,
            hold_ttl: None,
            request_tokens: DashMap::new(),
        }
    }

    /// Reservations granted from now on expire after `ttl`.
    pub fn with_hold_ttl(mut self, ttl: Duration) -> Self {
        self.hold_ttl = Some(ttl);
        self
    }

    /// Reserve one spot at `lot_id` for `username`.
    ///
    /// `NotFound` for unknown lots, `Busy` when the lot's lock could not be
    /// taken in time. A full lot yields [`ReserveOutcome::Denied`].
    pub async fn reserve(&self, lot_id: LotId, username: &str) -> DomainResult<ReserveOutcome> {
        let outcome = self.allocate(lot_id, username).await;
        record_outcome(&outcome);
        outcome
    }

    /// Like [`reserve`](Self::reserve), but repeated calls with the same
    /// `(username, request_token)` return the first granted reservation
    /// instead of taking another spot.
    ///
    /// Calls sharing a token run one at a time, so a duplicate waits for the
    /// outcome of the request ahead of it. A denied request leaves the token
    /// free for a later retry.
    pub async fn reserve_idempotent(
        &self,
        lot_id: LotId,
        username: &str,
        request_token: &str,
    ) -> DomainResult<ReserveOutcome> {
        let key = (username.to_string(), request_token.to_string());
        let slot = Arc::clone(&self.request_tokens.entry(key).or_default());
        let mut registered = slot.lock().await;

        if let Some(id) = *registered {
            let existing = self.get(id).await?;
            info!(
                reservation_id = %existing.id,
                username,
                "Replaying reservation for repeated request token"
            );
            return Ok(ReserveOutcome::Granted(existing));
        }

        let outcome = self.allocate(lot_id, username).await;
        record_outcome(&outcome);
        if let Ok(ReserveOutcome::Granted(reservation)) = &outcome {
            *registered = Some(reservation.id);
        }
        outcome
    }

    /// Release a reservation and return its spot to the lot.
    ///
    /// `NotFound` for unknown ids, `Conflict` if already released.
    pub async fn release(&self, id: ReservationId) -> DomainResult<Reservation> {
        self.release_with_reason(id, ReleaseReason::Cancelled).await
    }

    pub async fn get(&self, id: ReservationId) -> DomainResult<Reservation> {
        self.reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", id))
    }

    /// Number of active reservations at a lot.
    pub async fn active_count(&self, lot_id: LotId) -> DomainResult<usize> {
        self.reservations.count_active_for_lot(lot_id).await
    }

    /// Release every active reservation whose hold has lapsed.
    ///
    /// Reservations released concurrently by a caller are skipped. Returns
    /// how many reservations this call expired.
    pub async fn expire_overdue(&self) -> DomainResult<usize> {
        let overdue = self.reservations.find_overdue(Utc::now()).await?;
        if overdue.is_empty() {
            return Ok(0);
        }

        info!(count = overdue.len(), "Expiring overdue reservations");

        let mut expired = 0;
        for reservation in overdue {
            match self
                .release_with_reason(reservation.id, ReleaseReason::Expired)
                .await
            {
                Ok(_) => expired += 1,
                Err(DomainError::Conflict(_)) => {}
                Err(e) => {
                    warn!(reservation_id = %reservation.id, error = %e, "Failed to expire reservation")
                }
            }
        }
        Ok(expired)
    }

    async fn allocate(&self, lot_id: LotId, username: &str) -> DomainResult<ReserveOutcome> {
        let expires_at = self.expiry_from_now()?;

        if !self.lots.try_decrement_available(lot_id).await? {
            info!(lot_id, username, "Reservation denied, lot is full");
            return Ok(ReserveOutcome::Denied { lot_id });
        }

        let mut reservation = Reservation::pending(lot_id, username, expires_at);
        reservation.activate()?;

        if let Err(e) = self.reservations.save(reservation.clone()).await {
            error!(lot_id, error = %e, "Failed to store reservation, returning spot");
            self.lots.increment_available(lot_id).await?;
            return Err(e);
        }

        info!(
            reservation_id = %reservation.id,
            lot_id,
            username,
            "Reservation granted"
        );
        Ok(ReserveOutcome::Granted(reservation))
    }

    async fn release_with_reason(
        &self,
        id: ReservationId,
        reason: ReleaseReason,
    ) -> DomainResult<Reservation> {
        let released = self
            .reservations
            .mark_released(id, reason, Utc::now())
            .await?;
        self.lots.increment_available(released.lot_id).await?;

        metrics::counter!("parking_reservations_released_total", "reason" => reason.as_str())
            .increment(1);
        info!(
            reservation_id = %id,
            lot_id = released.lot_id,
            reason = reason.as_str(),
            "Reservation released"
        );
        Ok(released)
    }

    /// Expiry for a reservation granted now. Computed before a spot is
    /// taken so an unrepresentable hold cannot strand one.
    fn expiry_from_now(&self) -> DomainResult<Option<DateTime<Utc>>> {
        let Some(ttl) = self.hold_ttl else {
            return Ok(None);
        };
        Utc::now()
            .checked_add_signed(ttl)
            .map(Some)
            .ok_or_else(|| {
                DomainError::InvalidArgument(format!(
                    "hold time of {}s is out of range",
                    ttl.num_seconds()
                ))
            })
    }
}

fn record_outcome(outcome: &DomainResult<ReserveOutcome>) {
    let label = match outcome {
        Ok(ReserveOutcome::Granted(_)) => "granted",
        Ok(ReserveOutcome::Denied { .. }) => "denied",
        Err(DomainError::Busy(_)) => "busy",
        Err(_) => "error",
    };
    metrics::counter!("parking_reservations_total", "outcome" => label).increment(1);
}

// ── Tests ──────────────────────────────────────────────────────
