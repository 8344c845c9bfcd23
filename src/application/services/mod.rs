//! Application services

mod lot_service;
mod query_service;
mod reservation_expiry;
mod reservation_manager;

pub use lot_service::LotService;
pub use query_service::{NearbyLot, QueryService};
pub use reservation_expiry::start_reservation_expiry_task;
pub use reservation_manager::ReservationManager;
