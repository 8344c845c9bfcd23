//! # Parking Service
//!
//! Parking lot discovery and reservation: proximity search over lot
//! locations and spot reservations that never grant the same spot twice.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Entities, value objects and the storage/index traits
//! - **application**: Lot creation, search and reservation services
//! - **infrastructure**: In-memory lot store, reservation store, grid geo index
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: Error taxonomy and shutdown signalling
//! - **server**: Runtime that wires everything and serves HTTP

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use application::{LotService, NearbyLot, QueryService, ReservationManager};
pub use domain::{DomainError, DomainResult};
pub use interfaces::create_api_router;
pub use server::{init_tracing, ServerHandle, ServerOptions};
