//! Parking lot HTTP handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use crate::application::{LotService, QueryService};
use crate::domain::{Coordinates, LotId};
use crate::interfaces::http::common::{
    ApiError, ApiResponse, ApiResult, ValidatedJson, ValidatedQuery,
};

use super::dto::*;

#[utoipa::path(
    get,
    path = "/parkinglots",
    tag = "Parking Lots",
    params(SearchParkingLotsParams),
    responses(
        (status = 200, description = "Lots within the radius, nearest first", body = ApiResponse<Vec<NearbyParkingLotDto>>),
        (status = 400, description = "Invalid coordinates or radius")
    )
)]
pub async fn search_parking_lots(
    State(queries): State<Arc<QueryService>>,
    ValidatedQuery(params): ValidatedQuery<SearchParkingLotsParams>,
) -> ApiResult<Vec<NearbyParkingLotDto>> {
    debug!(username = %params.username, "Parking lot search requested");

    let center = Coordinates {
        latitude: params.coorx,
        longitude: params.coory,
    };
    let lots = queries.search(center, params.radius).await?;

    Ok(Json(ApiResponse::success(
        lots.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/parkinglots",
    tag = "Parking Lots",
    request_body = CreateParkingLotRequest,
    responses(
        (status = 201, description = "Lot created", body = ApiResponse<ParkingLotDto>),
        (status = 400, description = "Invalid capacity or coordinates"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_parking_lot(
    State(lots): State<Arc<LotService>>,
    ValidatedJson(request): ValidatedJson<CreateParkingLotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ParkingLotDto>>), ApiError> {
    let lot = lots.create(request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(lot.into())),
    ))
}

#[utoipa::path(
    get,
    path = "/parkinglots/{pl_id}",
    tag = "Parking Lots",
    params(("pl_id" = u64, Path, description = "Parking lot ID")),
    responses(
        (status = 200, description = "Parking lot", body = ApiResponse<ParkingLotDto>),
        (status = 404, description = "Parking lot not found")
    )
)]
pub async fn get_parking_lot(
    State(lots): State<Arc<LotService>>,
    Path(pl_id): Path<LotId>,
) -> ApiResult<ParkingLotDto> {
    let lot = lots.get(pl_id).await?;
    Ok(Json(ApiResponse::success(lot.into())))
}
