//! In-memory lot store
//!
//! Each lot lives in its own slot with a dedicated async mutex. The mutex
//! is the exclusive region for changes to the available-spots counter; the
//! counter itself is atomic so reads never wait on a reservation in
//! progress.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::parking_lot::{LotId, LotStore, ParkingLot};
use crate::shared::errors::{DomainError, DomainResult};

struct LotSlot {
    /// Immutable part of the record; `available_spots` here is stale.
    lot: ParkingLot,
    available: AtomicU32,
    committed: AtomicBool,
    gate: Mutex<()>,
}

impl LotSlot {
    fn new(lot: ParkingLot) -> Self {
        Self {
            available: AtomicU32::new(lot.available_spots),
            committed: AtomicBool::new(false),
            gate: Mutex::new(()),
            lot,
        }
    }

    fn is_committed(&self) -> bool {
        self.committed.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> ParkingLot {
        let mut lot = self.lot.clone();
        lot.available_spots = self.available.load(Ordering::Acquire);
        lot
    }
}

/// In-memory [`LotStore`] with one lock per lot.
pub struct InMemoryLotStore {
    lots: DashMap<LotId, Arc<LotSlot>>,
    lot_counter: AtomicU64,
    lock_timeout: Duration,
}

impl InMemoryLotStore {
    /// `lock_timeout` bounds how long a reservation waits for a lot's lock.
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            lots: DashMap::new(),
            lot_counter: AtomicU64::new(1),
            lock_timeout,
        }
    }

    /// Committed slot for `id`. The map guard is released before returning
    /// so callers can await on the slot's lock.
    fn slot(&self, id: LotId) -> DomainResult<Arc<LotSlot>> {
        self.lots
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|slot| slot.is_committed())
            .ok_or_else(|| DomainError::not_found("ParkingLot", "id", id))
    }
}

impl Default for InMemoryLotStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl LotStore for InMemoryLotStore {
    async fn next_id(&self) -> LotId {
        self.lot_counter.fetch_add(1, Ordering::SeqCst)
    }

    async fn insert_pending(&self, lot: ParkingLot) -> DomainResult<()> {
        match self.lots.entry(lot.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "parking lot {} already exists",
                lot.id
            ))),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::new(LotSlot::new(lot)));
                Ok(())
            }
        }
    }

    async fn commit(&self, id: LotId) -> DomainResult<()> {
        let entry = self
            .lots
            .get(&id)
            .ok_or_else(|| DomainError::not_found("ParkingLot", "id", id))?;
        entry.committed.store(true, Ordering::Release);
        Ok(())
    }

    async fn discard(&self, id: LotId) -> DomainResult<()> {
        let removed = self.lots.remove_if(&id, |_, slot| !slot.is_committed());
        if removed.is_none() && self.lots.contains_key(&id) {
            warn!(lot_id = id, "Refusing to discard a committed parking lot");
        }
        Ok(())
    }

    async fn get(&self, id: LotId) -> DomainResult<ParkingLot> {
        Ok(self.slot(id)?.snapshot())
    }

    async fn get_many(&self, ids: &[LotId]) -> DomainResult<Vec<ParkingLot>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.slot(*id).ok())
            .map(|slot| slot.snapshot())
            .collect())
    }

    async fn try_decrement_available(&self, id: LotId) -> DomainResult<bool> {
        let slot = self.slot(id)?;
        let _guard = tokio::time::timeout(self.lock_timeout, slot.gate.lock())
            .await
            .map_err(|_| {
                DomainError::Busy(format!(
                    "parking lot {} is locked by concurrent reservations",
                    id
                ))
            })?;

        let available = slot.available.load(Ordering::Acquire);
        if available == 0 {
            debug!(lot_id = id, "No spots available");
            return Ok(false);
        }
        slot.available.store(available - 1, Ordering::Release);
        Ok(true)
    }

    async fn increment_available(&self, id: LotId) -> DomainResult<()> {
        let slot = self.slot(id)?;
        let _guard = slot.gate.lock().await;

        let available = slot.available.load(Ordering::Acquire);
        if available >= slot.lot.total_spots {
            warn!(
                lot_id = id,
                total_spots = slot.lot.total_spots,
                "Spot returned to a lot that is already empty; ignoring"
            );
            return Ok(());
        }
        slot.available.store(available + 1, Ordering::Release);
        Ok(())
    }

    async fn count(&self) -> usize {
        self.lots.iter().filter(|e| e.value().is_committed()).count()
    }
}

// ── Tests ──────────────────────────────────────────────────────
