//! Hazard log: append-only record of hazards detected during a trip.
//!
//! Entries live in the trip's ledger slot, so appends are serialized with
//! samples and finalize for the same trip. Append order is the canonical
//! order. Counts are derived by scanning the log; nothing is cached.

use std::sync::Arc;

use jiff::Timestamp;
use tracing::debug;

use crate::error::{Result, TelemetryError, require_non_negative};
use crate::ledger::{TripLedger, TripSlot};
use crate::model::{
    HazardObservation, ObservationId, Position, Severity, SeverityCounts, TripId, tally,
};

pub struct HazardLog {
    ledger: Arc<TripLedger>,
}

impl HazardLog {
    pub fn new(ledger: Arc<TripLedger>) -> Self {
        Self { ledger }
    }

    /// Appends a hazard to an open trip's log.
    ///
    /// Late hazards for a finalized trip are rejected with `TripClosed`, so
    /// a report built after finalize can never go stale. `at` defaults to
    /// arrival time.
    pub fn append(
        &self,
        trip_id: TripId,
        position: Position,
        severity: Severity,
        speed_kmh: f64,
        at: Option<Timestamp>,
    ) -> Result<ObservationId> {
        self.ledger
            .with_slot(trip_id, |slot| self.append_locked(slot, position, severity, speed_kmh, at))
    }

    /// Observations for the trip, in append order.
    ///
    /// A trip with no hazards yields an empty vec.
    pub fn list_by_trip(&self, trip_id: TripId) -> Result<Vec<HazardObservation>> {
        self.ledger.with_slot(trip_id, |slot| Ok(slot.hazards.clone()))
    }

    /// Hazard count per severity, derived from the log.
    pub fn count_by_severity(&self, trip_id: TripId) -> Result<SeverityCounts> {
        self.ledger.with_slot(trip_id, |slot| Ok(tally(&slot.hazards)))
    }

    /// Append for a slot the caller already holds.
    pub(crate) fn append_locked(
        &self,
        slot: &mut TripSlot,
        position: Position,
        severity: Severity,
        speed_kmh: f64,
        at: Option<Timestamp>,
    ) -> Result<ObservationId> {
        slot.ensure_open()?;
        validate(position, speed_kmh)?;

        let observation = HazardObservation {
            id: ObservationId::new(),
            trip_id: slot.trip.id,
            position,
            severity,
            speed_kmh,
            observed_at: at.unwrap_or_else(Timestamp::now),
        };
        self.ledger
            .store()
            .append_hazard(&observation)
            .map_err(|e| self.ledger.refused(slot, e))?;

        let id = observation.id;
        debug!(
            trip = %slot.trip.id,
            observation = %id,
            %severity,
            latitude = position.latitude,
            longitude = position.longitude,
            "hazard appended"
        );
        slot.hazards.push(observation);
        Ok(id)
    }
}

pub(crate) fn validate(position: Position, speed_kmh: f64) -> Result<()> {
    if !position.is_finite() {
        return Err(TelemetryError::InvalidInput(format!(
            "position must be finite, got ({}, {})",
            position.latitude, position.longitude
        )));
    }
    require_non_negative("speed", speed_kmh)
}
