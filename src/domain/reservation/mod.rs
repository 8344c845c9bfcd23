//! Reservation aggregate
//!
//! Contains the Reservation entity, related types, and repository interface.

pub mod model;
pub mod repository;

pub use model::{ReleaseReason, Reservation, ReservationId, ReservationState, ReserveOutcome};
pub use repository::ReservationRepository;
