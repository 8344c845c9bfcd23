//! In-memory storage implementations

pub mod lot_store;
pub mod reservation_store;

pub use lot_store::InMemoryLotStore;
pub use reservation_store::InMemoryReservationRepository;
