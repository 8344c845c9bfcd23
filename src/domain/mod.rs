pub mod geo;
pub mod parking_lot;
pub mod reservation;

// Re-export commonly used types
pub use geo::Coordinates;
pub use parking_lot::{GeoHit, GeoIndex, LotId, LotStore, NewParkingLot, ParkingLot};
pub use reservation::{
    ReleaseReason, Reservation, ReservationId, ReservationRepository, ReservationState,
    ReserveOutcome,
};

pub use crate::shared::errors::{DomainError, DomainResult};
