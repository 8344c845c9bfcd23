//! Parking lot registration and lookup

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::{GeoIndex, LotId, LotStore, NewParkingLot, ParkingLot};
use crate::shared::errors::DomainResult;

/// Keeps the lot store and the geo index in step when lots are created.
pub struct LotService {
    lots: Arc<dyn LotStore>,
    index: Arc<dyn GeoIndex>,
}

impl LotService {
    pub fn new(lots: Arc<dyn LotStore>, index: Arc<dyn GeoIndex>) -> Self {
        Self { lots, index }
    }

    /// Register a lot in both the store and the index.
    ///
    /// The lot is staged in the store, indexed, then committed. If indexing
    /// fails the staged record is discarded; if the commit fails the index
    /// entry is removed. Either way the original error is returned and the
    /// lot is visible in neither component.
    pub async fn create(&self, new_lot: NewParkingLot) -> DomainResult<ParkingLot> {
        let total_spots = new_lot.validate()?;

        let id = self.lots.next_id().await;
        let lot = ParkingLot::new(
            id,
            new_lot.name,
            new_lot.address,
            new_lot.coordinates,
            total_spots,
        );

        self.lots.insert_pending(lot.clone()).await?;

        if let Err(e) = self.index.insert(id, lot.coordinates).await {
            warn!(lot_id = id, error = %e, "Geo index insert failed, discarding lot");
            if let Err(discard_err) = self.lots.discard(id).await {
                error!(lot_id = id, error = %discard_err, "Failed to discard staged lot");
            }
            return Err(e);
        }

        if let Err(e) = self.lots.commit(id).await {
            warn!(lot_id = id, error = %e, "Lot commit failed, removing index entry");
            if let Err(remove_err) = self.index.remove(id).await {
                error!(lot_id = id, error = %remove_err, "Failed to remove index entry");
            }
            if let Err(discard_err) = self.lots.discard(id).await {
                error!(lot_id = id, error = %discard_err, "Failed to discard staged lot");
            }
            return Err(e);
        }

        metrics::counter!("parking_lots_created_total").increment(1);
        info!(
            lot_id = id,
            total_spots,
            latitude = lot.coordinates.latitude,
            longitude = lot.coordinates.longitude,
            "Parking lot created"
        );

        Ok(lot)
    }

    pub async fn get(&self, id: LotId) -> DomainResult<ParkingLot> {
        self.lots.get(id).await
    }

    pub async fn count(&self) -> usize {
        self.lots.count().await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::domain::{Coordinates, DomainError, GeoHit};
    use crate::infrastructure::{GridGeoIndex, InMemoryLotStore};

    /// Index whose writes always fail.
    struct UnavailableIndex;

    #[async_trait]
    impl GeoIndex for UnavailableIndex {
        async fn insert(&self, _: LotId, _: Coordinates) -> DomainResult<()> {
            Err(DomainError::Unavailable("geo index offline".into()))
        }

        async fn remove(&self, _: LotId) -> DomainResult<()> {
            Ok(())
        }

        async fn query(&self, _: Coordinates, _: f64) -> DomainResult<Vec<GeoHit>> {
            Ok(Vec::new())
        }

        async fn contains(&self, _: LotId) -> bool {
            false
        }
    }

    fn new_lot(total_spots: i64) -> NewParkingLot {
        NewParkingLot {
            name: "Chilonzor".into(),
            address: Some("Bunyodkor 1".into()),
            coordinates: Coordinates {
                latitude: 41.28,
                longitude: 69.20,
            },
            total_spots,
        }
    }

    fn service() -> (LotService, Arc<InMemoryLotStore>, Arc<GridGeoIndex>) {
        let lots = Arc::new(InMemoryLotStore::default());
        let index = Arc::new(GridGeoIndex::new(0.01).unwrap());
        (LotService::new(lots.clone(), index.clone()), lots, index)
    }

    #[tokio::test]
    async fn create_registers_in_store_and_index() {
        let (svc, lots, index) = service();
        let lot = svc.create(new_lot(12)).await.unwrap();

        assert_eq!(lot.total_spots, 12);
        assert_eq!(lot.available_spots, 12);
        assert_eq!(svc.get(lot.id).await.unwrap(), lot);
        assert!(index.contains(lot.id).await);
        assert_eq!(lots.count().await, 1);
    }

    #[tokio::test]
    async fn create_assigns_distinct_ids() {
        let (svc, _, _) = service();
        let a = svc.create(new_lot(1)).await.unwrap();
        let b = svc.create(new_lot(1)).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn non_positive_capacity_leaves_no_trace() {
        let (svc, lots, index) = service();
        for spots in [0, -4] {
            let err = svc.create(new_lot(spots)).await.unwrap_err();
            assert!(matches!(err, DomainError::InvalidArgument(_)));
        }
        assert_eq!(lots.count().await, 0);
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn index_failure_rolls_back_store() {
        let lots = Arc::new(InMemoryLotStore::default());
        let svc = LotService::new(lots.clone(), Arc::new(UnavailableIndex));

        let err = svc.create(new_lot(3)).await.unwrap_err();
        assert!(matches!(err, DomainError::Unavailable(_)));
        assert_eq!(lots.count().await, 0);
        // The staged record is gone, not merely hidden.
        assert!(lots.insert_pending(ParkingLot::new(
            1,
            "retry",
            None,
            new_lot(3).coordinates,
            3
        ))
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn unknown_lot_is_not_found() {
        let (svc, _, _) = service();
        assert!(matches!(
            svc.get(404).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
