//! Reservation domain entity

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::parking_lot::LotId;
use crate::shared::errors::{DomainError, DomainResult};

pub type ReservationId = Uuid;

/// Reservation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    /// Spot taken, record not yet published
    Pending,
    /// Spot held by the user
    Active,
    /// Spot returned to the lot (terminal)
    Released,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Released => "RELEASED",
        }
    }
}

impl std::fmt::Display for ReservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a reservation was released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    /// Released explicitly by a caller
    Cancelled,
    /// Hold time elapsed
    Expired,
}

impl ReleaseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

/// A grant of one spot at one lot to one user
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: ReservationId,
    pub lot_id: LotId,
    pub username: String,
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
    /// When the hold lapses; `None` holds until released
    pub expires_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_reason: Option<ReleaseReason>,
}

impl Reservation {
    pub fn pending(
        lot_id: LotId,
        username: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            lot_id,
            username: username.into(),
            state: ReservationState::Pending,
            created_at: Utc::now(),
            expires_at,
            released_at: None,
            release_reason: None,
        }
    }

    /// PENDING → ACTIVE
    pub fn activate(&mut self) -> DomainResult<()> {
        if self.state != ReservationState::Pending {
            return Err(DomainError::Conflict(format!(
                "reservation {} cannot be activated from {}",
                self.id, self.state
            )));
        }
        self.state = ReservationState::Active;
        Ok(())
    }

    /// ACTIVE → RELEASED. Releasing twice is a `Conflict`.
    pub fn release(&mut self, reason: ReleaseReason, at: DateTime<Utc>) -> DomainResult<()> {
        match self.state {
            ReservationState::Active => {
                self.state = ReservationState::Released;
                self.released_at = Some(at);
                self.release_reason = Some(reason);
                Ok(())
            }
            ReservationState::Released => Err(DomainError::Conflict(format!(
                "reservation {} is already released",
                self.id
            ))),
            ReservationState::Pending => Err(DomainError::Conflict(format!(
                "reservation {} is still pending",
                self.id
            ))),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ReservationState::Active
    }

    /// Active and past its expiry time
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result of a reservation attempt. `Denied` is a normal business outcome
/// (the lot is full), not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ReserveOutcome {
    Granted(Reservation),
    Denied { lot_id: LotId },
}

impl ReserveOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            Self::Granted(r) => Some(r),
            Self::Denied { .. } => None,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
