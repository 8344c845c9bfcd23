//! Reservation HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::application::ReservationManager;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedQuery};

use super::dto::*;

#[utoipa::path(
    get,
    path = "/reserve",
    tag = "Reservations",
    params(ReserveParams),
    responses(
        (status = 200, description = "Granted or denied (lot full)", body = ApiResponse<ReserveResponse>),
        (status = 404, description = "Parking lot not found"),
        (status = 503, description = "Lot busy, retry later")
    )
)]
pub async fn reserve_spot(
    State(manager): State<Arc<ReservationManager>>,
    ValidatedQuery(params): ValidatedQuery<ReserveParams>,
) -> ApiResult<ReserveResponse> {
    let outcome = match params.request_token.as_deref() {
        Some(token) => {
            manager
                .reserve_idempotent(params.park_id, &params.username, token)
                .await?
        }
        None => manager.reserve(params.park_id, &params.username).await?,
    };
    Ok(Json(ApiResponse::success(outcome.into())))
}

#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "Reservations",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(manager): State<Arc<ReservationManager>>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReservationDto> {
    let reservation = manager.get(id).await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}

#[utoipa::path(
    post,
    path = "/reservations/{id}/release",
    tag = "Reservations",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation released", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation already released")
    )
)]
pub async fn release_reservation(
    State(manager): State<Arc<ReservationManager>>,
    Path(id): Path<Uuid>,
) -> ApiResult<ReservationDto> {
    let reservation = manager.release(id).await?;
    Ok(Json(ApiResponse::success(reservation.into())))
}
