//! Parking lot DTOs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::NearbyLot;
use crate::domain::{Coordinates, LotId, NewParkingLot, ParkingLot};

/// Proximity search parameters
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParkingLotsParams {
    /// Requesting user (logged only)
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    /// Center latitude in degrees
    pub coorx: f64,
    /// Center longitude in degrees
    pub coory: f64,
    /// Search radius in meters
    pub radius: f64,
}

/// Request to register a new parking lot
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateParkingLotRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    pub coordinates: Coordinates,
    /// Capacity; must be positive
    #[schema(example = 120)]
    pub total_spots: i64,
}

impl From<CreateParkingLotRequest> for NewParkingLot {
    fn from(req: CreateParkingLotRequest) -> Self {
        NewParkingLot {
            name: req.name,
            address: req.address,
            coordinates: req.coordinates,
            total_spots: req.total_spots,
        }
    }
}

/// Parking lot in API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParkingLotDto {
    pub id: LotId,
    pub name: String,
    pub address: Option<String>,
    pub coordinates: Coordinates,
    pub total_spots: u32,
    pub available_spots: u32,
    pub created_at: String,
}

impl From<ParkingLot> for ParkingLotDto {
    fn from(lot: ParkingLot) -> Self {
        Self {
            id: lot.id,
            name: lot.name,
            address: lot.address,
            coordinates: lot.coordinates,
            total_spots: lot.total_spots,
            available_spots: lot.available_spots,
            created_at: lot.created_at.to_rfc3339(),
        }
    }
}

/// Search hit: a lot and its distance from the search center
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NearbyParkingLotDto {
    pub lot: ParkingLotDto,
    pub distance_meters: f64,
}

impl From<NearbyLot> for NearbyParkingLotDto {
    fn from(hit: NearbyLot) -> Self {
        Self {
            lot: hit.lot.into(),
            distance_meters: hit.distance_meters,
        }
    }
}
