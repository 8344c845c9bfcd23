//! Geospatial index interface

use async_trait::async_trait;

use super::model::LotId;
use crate::domain::geo::Coordinates;
use crate::shared::errors::DomainResult;

/// A lot found by a radius query, with its distance from the query center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoHit {
    pub lot_id: LotId,
    pub distance_meters: f64,
}

/// Radius queries over lot locations.
#[async_trait]
pub trait GeoIndex: Send + Sync {
    /// Add a lot, replacing any earlier position for the same id
    async fn insert(&self, lot_id: LotId, coordinates: Coordinates) -> DomainResult<()>;

    /// Remove a lot; unknown ids are ignored
    async fn remove(&self, lot_id: LotId) -> DomainResult<()>;

    /// Every lot whose great-circle distance from `center` is at most
    /// `radius_meters`. Order is unspecified.
    async fn query(&self, center: Coordinates, radius_meters: f64) -> DomainResult<Vec<GeoHit>>;

    /// Whether a lot is indexed
    async fn contains(&self, lot_id: LotId) -> bool;
}
