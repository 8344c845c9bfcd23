//! Reservation DTOs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{LotId, Reservation, ReserveOutcome};

/// Reservation request parameters
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReserveParams {
    /// Requesting user
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    /// Parking lot to reserve at
    #[serde(rename = "parkID")]
    pub park_id: LotId,
    /// Client-chosen token; retries with the same token return the
    /// original reservation
    #[serde(rename = "requestToken")]
    #[validate(length(min = 1, max = 128))]
    pub request_token: Option<String>,
}

/// Reservation details in API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationDto {
    pub id: Uuid,
    pub lot_id: LotId,
    pub username: String,
    /// `ACTIVE` or `RELEASED`
    pub state: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub released_at: Option<String>,
    /// `cancelled` or `expired`
    pub release_reason: Option<String>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            lot_id: r.lot_id,
            username: r.username,
            state: r.state.as_str().to_string(),
            created_at: r.created_at.to_rfc3339(),
            expires_at: r.expires_at.map(|t| t.to_rfc3339()),
            released_at: r.released_at.map(|t| t.to_rfc3339()),
            release_reason: r.release_reason.map(|reason| reason.as_str().to_string()),
        }
    }
}

/// Result of a reservation attempt
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReserveResponse {
    /// `granted` or `denied` (lot full)
    pub outcome: String,
    pub lot_id: LotId,
    /// Present when granted
    pub reservation: Option<ReservationDto>,
}

impl From<ReserveOutcome> for ReserveResponse {
    fn from(outcome: ReserveOutcome) -> Self {
        match outcome {
            ReserveOutcome::Granted(reservation) => Self {
                outcome: "granted".to_string(),
                lot_id: reservation.lot_id,
                reservation: Some(reservation.into()),
            },
            ReserveOutcome::Denied { lot_id } => Self {
                outcome: "denied".to_string(),
                lot_id,
                reservation: None,
            },
        }
    }
}
