//! Parking lot domain entity

use chrono::{DateTime, Utc};

use crate::domain::geo::Coordinates;
use crate::shared::errors::{DomainError, DomainResult};

/// Parking lot identifier, assigned by the lot store at creation.
pub type LotId = u64;

/// Input for registering a new lot.
///
/// `total_spots` is signed so that callers can express (and be refused)
/// non-positive capacities.
#[derive(Debug, Clone)]
pub struct NewParkingLot {
    pub name: String,
    pub address: Option<String>,
    pub coordinates: Coordinates,
    pub total_spots: i64,
}

impl NewParkingLot {
    /// Check the capacity and coordinates, returning the capacity as `u32`.
    pub fn validate(&self) -> DomainResult<u32> {
        self.coordinates.validate()?;
        if self.total_spots <= 0 {
            return Err(DomainError::InvalidArgument(format!(
                "total_spots must be positive, got {}",
                self.total_spots
            )));
        }
        u32::try_from(self.total_spots).map_err(|_| {
            DomainError::InvalidArgument(format!(
                "total_spots {} exceeds the supported maximum",
                self.total_spots
            ))
        })
    }
}

/// A parking facility with fixed capacity and location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingLot {
    pub id: LotId,
    pub name: String,
    pub address: Option<String>,
    pub coordinates: Coordinates,
    pub total_spots: u32,
    /// Always within `0..=total_spots`.
    pub available_spots: u32,
    pub created_at: DateTime<Utc>,
}

impl ParkingLot {
    /// A freshly created lot with every spot available.
    pub fn new(
        id: LotId,
        name: impl Into<String>,
        address: Option<String>,
        coordinates: Coordinates,
        total_spots: u32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address,
            coordinates,
            total_spots,
            available_spots: total_spots,
            created_at: Utc::now(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
