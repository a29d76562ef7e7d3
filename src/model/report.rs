//! The report model handed to external renderers.

use std::collections::BTreeMap;

use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

use super::{HazardObservation, Severity, Trip};

/// Hazard tallies keyed by severity. Every known severity is present.
pub type SeverityCounts = BTreeMap<Severity, usize>;

/// Immutable summary of a closed trip and its hazards.
///
/// Owns copies of everything it shows; later changes to the ledger or log
/// never reach an already built report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripReport {
    pub trip: Trip,
    pub ended_at: Timestamp,
    pub total_hazards: usize,
    pub severity_counts: SeverityCounts,

    /// Observations in append order.
    pub observations: Vec<HazardObservation>,
}

impl TripReport {
    /// Hazards recorded with the given severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }

    /// Wall-clock time between trip start and finalize.
    #[must_use]
    pub fn duration(&self) -> SignedDuration {
        self.ended_at.duration_since(self.trip.started_at)
    }
}

/// Tallies observations per severity, seeding every known severity with zero.
#[must_use]
pub fn tally<'a>(observations: impl IntoIterator<Item = &'a HazardObservation>) -> SeverityCounts {
    let mut counts: SeverityCounts = Severity::ALL.into_iter().map(|s| (s, 0)).collect();
    for obs in observations {
        *counts.entry(obs.severity).or_insert(0) += 1;
    }
    counts
}
