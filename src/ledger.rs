//! Trip ledger: authoritative trip state and running aggregates.
//!
//! Each trip lives in its own [`TripSlot`] behind its own mutex. The slot
//! holds both the trip record and its hazard log, so samples, hazard appends
//! and finalize for one trip are strictly serialized while different trips
//! never contend. The registry lock is only held to look up or insert a
//! slot handle.
//!
//! Every mutation is validated, then written to the [`TripStore`], and only
//! then applied in memory. A rejected call leaves no trace.
//!
//! Other engines may write to the same store. A trip this ledger has not
//! seen is loaded on first use, and a write the store refuses because the
//! trip was closed elsewhere brings the slot up to date before failing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use jiff::Timestamp;
use tracing::{debug, info, warn};

use crate::error::{Result, TelemetryError, require_label, require_non_negative};
use crate::model::{HazardObservation, Trip, TripId};
use crate::storage::{StorageError, TripStore};

/// One trip's record and hazard log, guarded together.
pub(crate) struct TripSlot {
    pub(crate) trip: Trip,
    pub(crate) hazards: Vec<HazardObservation>,
}

impl TripSlot {
    /// Fails with `TripClosed` unless the trip still accepts mutation.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.trip.is_open() {
            Ok(())
        } else {
            Err(TelemetryError::TripClosed(self.trip.id))
        }
    }
}

type SlotHandle = Arc<Mutex<TripSlot>>;

pub struct TripLedger {
    store: Arc<dyn TripStore>,
    trips: RwLock<HashMap<TripId, SlotHandle>>,
}

impl TripLedger {
    /// An empty ledger writing through to `store`.
    ///
    /// Use [`TripLedger::open`] when the store may already hold trips.
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self {
            store,
            trips: RwLock::new(HashMap::new()),
        }
    }

    /// Builds a ledger from everything `store` already holds.
    pub fn open(store: Arc<dyn TripStore>) -> Result<Self> {
        let mut trips = HashMap::new();
        for trip in store.load_trips()? {
            let hazards = store.load_hazards(trip.id)?;
            trips.insert(trip.id, Arc::new(Mutex::new(TripSlot { trip, hazards })));
        }
        info!(trips = trips.len(), "ledger loaded from store");
        Ok(Self {
            store,
            trips: RwLock::new(trips),
        })
    }

    /// Starts a new open trip and returns its identifier.
    pub fn create_trip(&self, driver: &str, origin: &str, destination: &str) -> Result<TripId> {
        require_label("driver", driver)?;
        require_label("origin", origin)?;
        require_label("destination", destination)?;

        let trip = Trip::open(
            driver.to_string(),
            origin.to_string(),
            destination.to_string(),
            Timestamp::now(),
        );
        let id = trip.id;
        self.store.insert_trip(&trip)?;

        let slot = TripSlot {
            trip,
            hazards: Vec::new(),
        };
        self.trips
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(slot)));

        info!(trip = %id, driver, origin, destination, "trip started");
        Ok(id)
    }

    /// Applies one telemetry sample to an open trip.
    ///
    /// Distance accumulates; speed is last-write-wins. `at` defaults to now.
    pub fn record_sample(
        &self,
        id: TripId,
        delta_km: f64,
        speed_kmh: f64,
        at: Option<Timestamp>,
    ) -> Result<()> {
        self.with_slot(id, |slot| self.apply_sample(slot, delta_km, speed_kmh, at))
    }

    /// Closes an open trip and returns its final snapshot.
    ///
    /// A second call fails with `TripClosed`; finalize is a transition, not
    /// a query. The hazard log is reloaded with the close, so hazards other
    /// writers appended before it are part of the final record.
    pub fn finalize(&self, id: TripId) -> Result<Trip> {
        self.with_slot(id, |slot| {
            slot.ensure_open()?;

            let trip = self
                .store
                .close_trip(id, Timestamp::now())
                .map_err(|e| self.refused(slot, e))?;
            let hazards = self.store.load_hazards(id)?;
            slot.trip = trip;
            slot.hazards = hazards;

            info!(
                trip = %id,
                distance_km = slot.trip.distance_km,
                hazards = slot.hazards.len(),
                "trip finalized"
            );
            Ok(slot.trip.clone())
        })
    }

    /// A read-only snapshot of the trip.
    pub fn get_trip(&self, id: TripId) -> Result<Trip> {
        self.with_slot(id, |slot| Ok(slot.trip.clone()))
    }

    /// Every trip, ordered by start time.
    pub fn list_trips(&self) -> Vec<Trip> {
        let mut trips: Vec<Trip> = self
            .handles()
            .iter()
            .map(|h| lock_slot(h).trip.clone())
            .collect();
        trips.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        trips
    }

    /// Finalized trips only, ordered by start time.
    pub fn closed_trips(&self) -> Vec<Trip> {
        self.list_trips()
            .into_iter()
            .filter(|t| !t.is_open())
            .collect()
    }

    /// Runs `f` with the trip's slot locked.
    ///
    /// A trip missing from the registry is looked up in the store before
    /// the call fails with `TripNotFound`.
    pub(crate) fn with_slot<T>(
        &self,
        id: TripId,
        f: impl FnOnce(&mut TripSlot) -> Result<T>,
    ) -> Result<T> {
        let cached = self
            .trips
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();
        let handle = match cached {
            Some(handle) => handle,
            None => self.adopt(id)?,
        };
        let mut slot = lock_slot(&handle);
        f(&mut slot)
    }

    /// Registers a trip another writer put in the store.
    fn adopt(&self, id: TripId) -> Result<SlotHandle> {
        let slot = self.reload(id)?.ok_or(TelemetryError::TripNotFound(id))?;
        debug!(trip = %id, "trip loaded from store");
        let handle = self
            .trips
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(slot)))
            .clone();
        Ok(handle)
    }

    fn reload(&self, id: TripId) -> Result<Option<TripSlot>> {
        let Some(trip) = self.store.load_trip(id)? else {
            return Ok(None);
        };
        let hazards = self.store.load_hazards(id)?;
        Ok(Some(TripSlot { trip, hazards }))
    }

    /// Replaces the slot with what the store currently holds for it.
    pub(crate) fn refresh(&self, slot: &mut TripSlot) -> Result<()> {
        if let Some(fresh) = self.reload(slot.trip.id)? {
            *slot = fresh;
        }
        Ok(())
    }

    /// Converts a refused store write into the caller's error.
    ///
    /// When the store reports the trip closed, the slot is caught up first
    /// so later calls fail on the in-memory check.
    pub(crate) fn refused(&self, slot: &mut TripSlot, err: StorageError) -> TelemetryError {
        if let StorageError::TripClosed(id) = err {
            info!(trip = %id, "trip was closed by another writer");
            if let Err(e) = self.refresh(slot) {
                warn!(trip = %id, error = %e, "failed to reload closed trip");
            }
        }
        err.into()
    }

    /// Sample application for a slot the caller already holds.
    pub(crate) fn apply_sample(
        &self,
        slot: &mut TripSlot,
        delta_km: f64,
        speed_kmh: f64,
        at: Option<Timestamp>,
    ) -> Result<()> {
        slot.ensure_open()?;
        require_non_negative("distance delta", delta_km)?;
        require_non_negative("speed", speed_kmh)?;

        let at = at.unwrap_or_else(Timestamp::now);
        let trip = self
            .store
            .record_sample(slot.trip.id, delta_km, speed_kmh, at)
            .map_err(|e| self.refused(slot, e))?;
        slot.trip = trip;

        debug!(
            trip = %slot.trip.id,
            delta_km,
            speed_kmh,
            distance_km = slot.trip.distance_km,
            "sample recorded"
        );
        Ok(())
    }

    pub(crate) fn store(&self) -> &dyn TripStore {
        self.store.as_ref()
    }

    /// Snapshot of all slot handles; the registry lock is released on return.
    pub(crate) fn handles(&self) -> Vec<SlotHandle> {
        self.trips
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

/// Slots are only written after every check and the store write succeed,
/// and are then replaced whole, so a poisoned slot still holds consistent
/// state.
pub(crate) fn lock_slot(handle: &Mutex<TripSlot>) -> std::sync::MutexGuard<'_, TripSlot> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
