//! Parking lot aggregate
//!
//! Contains the ParkingLot entity, the lot store interface and the
//! geospatial index interface.

pub mod geo_index;
pub mod model;
pub mod repository;

pub use geo_index::{GeoHit, GeoIndex};
pub use model::{LotId, NewParkingLot, ParkingLot};
pub use repository::LotStore;
