//! Infrastructure layer
//!
//! In-memory implementations of the domain storage and index interfaces.
//! A durable backend plugs in by implementing the same traits.

pub mod geo;
pub mod storage;

pub use geo::GridGeoIndex;
pub use storage::{InMemoryLotStore, InMemoryReservationRepository};
