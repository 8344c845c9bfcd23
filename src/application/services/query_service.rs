//! Proximity search over parking lots

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{Coordinates, GeoIndex, LotId, LotStore, ParkingLot};
use crate::shared::errors::DomainResult;

/// A lot returned by a search together with its distance from the center.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyLot {
    pub lot: ParkingLot,
    pub distance_meters: f64,
}

pub struct QueryService {
    index: Arc<dyn GeoIndex>,
    lots: Arc<dyn LotStore>,
}

impl QueryService {
    pub fn new(index: Arc<dyn GeoIndex>, lots: Arc<dyn LotStore>) -> Self {
        Self { index, lots }
    }

    /// Lots within `radius_meters` of `center`, nearest first.
    ///
    /// Distances come from the index and are not recomputed. Lots the index
    /// knows about but the store does not (yet) expose are left out.
    pub async fn search(
        &self,
        center: Coordinates,
        radius_meters: f64,
    ) -> DomainResult<Vec<NearbyLot>> {
        let mut hits = self.index.query(center, radius_meters).await?;
        hits.sort_by(|a, b| {
            a.distance_meters
                .total_cmp(&b.distance_meters)
                .then(a.lot_id.cmp(&b.lot_id))
        });

        let ids: Vec<LotId> = hits.iter().map(|h| h.lot_id).collect();
        let distances: HashMap<LotId, f64> = hits
            .iter()
            .map(|h| (h.lot_id, h.distance_meters))
            .collect();

        let results: Vec<NearbyLot> = self
            .lots
            .get_many(&ids)
            .await?
            .into_iter()
            .filter_map(|lot| {
                distances.get(&lot.id).map(|&distance_meters| NearbyLot {
                    lot,
                    distance_meters,
                })
            })
            .collect();

        metrics::histogram!("parking_search_results").record(results.len() as f64);
        debug!(
            latitude = center.latitude,
            longitude = center.longitude,
            radius_meters,
            found = results.len(),
            "Parking lot search"
        );

        Ok(results)
    }
}

// ── Tests ──────────────────────────────────────────────────────
