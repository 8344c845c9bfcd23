pub mod services;

// Re-export key types for convenience
pub use services::{
    start_reservation_expiry_task, LotService, NearbyLot, QueryService, ReservationManager,
};
