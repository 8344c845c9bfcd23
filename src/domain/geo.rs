//! Geographic value objects and great-circle distance.
//!
//! Distances are computed with the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_METERS`]. All radii and distances in the crate are meters.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::errors::{DomainError, DomainResult};

/// Mean Earth radius used for every distance computation.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build validated coordinates.
    pub fn new(latitude: f64, longitude: f64) -> DomainResult<Self> {
        let coordinates = Self {
            latitude,
            longitude,
        };
        coordinates.validate()?;
        Ok(coordinates)
    }

    /// Latitude must lie in [-90, 90] and longitude in [-180, 180].
    pub fn validate(&self) -> DomainResult<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(DomainError::InvalidArgument(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(DomainError::InvalidArgument(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// Haversine distance between two points in meters.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Radius must be a finite, non-negative number of meters.
pub fn validate_radius(radius_meters: f64) -> DomainResult<()> {
    if !radius_meters.is_finite() || radius_meters < 0.0 {
        return Err(DomainError::InvalidArgument(format!(
            "radius {} must be a non-negative number of meters",
            radius_meters
        )));
    }
    Ok(())
}
