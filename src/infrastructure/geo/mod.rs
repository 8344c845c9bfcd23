//! Geospatial index implementations

pub mod grid;

pub use grid::GridGeoIndex;
