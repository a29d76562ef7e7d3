//! Report assembly for finalized trips.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, TelemetryError};
use crate::ledger::TripLedger;
use crate::model::{TripId, TripReport, tally};

/// Builds [`TripReport`]s from closed trips.
///
/// Reports are recomputed on every call. Once a trip is closed neither its
/// record nor its log can change, so repeated builds are identical.
pub struct ReportAssembler {
    ledger: Arc<TripLedger>,
}

impl ReportAssembler {
    pub fn new(ledger: Arc<TripLedger>) -> Self {
        Self { ledger }
    }

    /// Composes the report for a finalized trip.
    ///
    /// Fails with `TripStillOpen` until [`TripLedger::finalize`] succeeds.
    /// A trip still open here is re-read from the store first, in case
    /// another writer finalized it.
    pub fn build_report(&self, trip_id: TripId) -> Result<TripReport> {
        self.ledger.with_slot(trip_id, |slot| {
            if slot.trip.is_open() {
                self.ledger.refresh(slot)?;
            }
            let ended_at = slot
                .trip
                .ended_at()
                .ok_or(TelemetryError::TripStillOpen(trip_id))?;

            let report = TripReport {
                trip: slot.trip.clone(),
                ended_at,
                total_hazards: slot.hazards.len(),
                severity_counts: tally(&slot.hazards),
                observations: slot.hazards.clone(),
            };
            debug!(trip = %trip_id, hazards = report.total_hazards, "report built");
            Ok(report)
        })
    }
}
