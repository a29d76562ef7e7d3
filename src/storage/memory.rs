//! In-process store: nothing survives the process.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use jiff::Timestamp;

use crate::model::{HazardObservation, Trip, TripId, TripStatus};

use super::{Result, StorageError, TripStore};

#[derive(Default)]
struct MemoryState {
    trips: HashMap<TripId, Trip>,
    hazards: Vec<HazardObservation>,
}

/// A [`TripStore`] held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    /// The stored trip, provided it still accepts writes.
    fn open_trip(&mut self, trip_id: TripId) -> Result<&mut Trip> {
        let trip = self
            .trips
            .get_mut(&trip_id)
            .ok_or(StorageError::TripNotFound(trip_id))?;
        if !trip.is_open() {
            return Err(StorageError::TripClosed(trip_id));
        }
        Ok(trip)
    }
}

impl TripStore for MemoryStore {
    fn insert_trip(&self, trip: &Trip) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.trips.contains_key(&trip.id) {
            return Err(StorageError::TripAlreadyExists(trip.id));
        }
        state.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    fn record_sample(
        &self,
        trip_id: TripId,
        delta_km: f64,
        speed_kmh: f64,
        at: Timestamp,
    ) -> Result<Trip> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let trip = state.open_trip(trip_id)?;
        trip.distance_km += delta_km;
        trip.speed_kmh = speed_kmh;
        trip.samples += 1;
        trip.last_sample_at = Some(at);
        Ok(trip.clone())
    }

    fn close_trip(&self, trip_id: TripId, ended_at: Timestamp) -> Result<Trip> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let trip = state.open_trip(trip_id)?;
        trip.status = TripStatus::Closed { ended_at };
        Ok(trip.clone())
    }

    fn append_hazard(&self, hazard: &HazardObservation) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open_trip(hazard.trip_id)?;
        state.hazards.push(hazard.clone());
        Ok(())
    }

    fn load_trip(&self, trip_id: TripId) -> Result<Option<Trip>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.trips.get(&trip_id).cloned())
    }

    fn load_trips(&self) -> Result<Vec<Trip>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(state.trips.values().cloned().collect())
    }

    fn load_hazards(&self, trip_id: TripId) -> Result<Vec<HazardObservation>> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.trips.contains_key(&trip_id) {
            return Err(StorageError::TripNotFound(trip_id));
        }
        Ok(state
            .hazards
            .iter()
            .filter(|h| h.trip_id == trip_id)
            .cloned()
            .collect())
    }
}
