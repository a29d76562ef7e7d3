//! Trip types: one monitored vehicle journey.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a trip, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(Uuid);

impl TripId {
    /// Allocates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The first eight characters, for human-facing listings.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TripId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TripId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for TripId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A vehicle journey and its running aggregates.
///
/// Snapshots handed out by the ledger are plain values; mutating one has
/// no effect on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub driver: String,
    pub origin: String,
    pub destination: String,
    pub started_at: Timestamp,

    /// Sum of every recorded distance delta, in kilometres.
    pub distance_km: f64,

    /// Speed reported by the most recent sample, in km/h.
    pub speed_kmh: f64,

    /// Number of samples applied so far.
    pub samples: u64,

    /// Timestamp of the most recent sample, if any arrived.
    pub last_sample_at: Option<Timestamp>,

    pub status: TripStatus,
}

impl Trip {
    /// A fresh open trip with zeroed aggregates.
    #[must_use]
    pub fn open(
        driver: String,
        origin: String,
        destination: String,
        started_at: Timestamp,
    ) -> Self {
        Self {
            id: TripId::new(),
            driver,
            origin,
            destination,
            started_at,
            distance_km: 0.0,
            speed_kmh: 0.0,
            samples: 0,
            last_sample_at: None,
            status: TripStatus::Open,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.status, TripStatus::Open)
    }

    /// When the trip was finalized, or `None` while it is still open.
    #[must_use]
    pub fn ended_at(&self) -> Option<Timestamp> {
        match self.status {
            TripStatus::Open => None,
            TripStatus::Closed { ended_at } => Some(ended_at),
        }
    }
}

/// Where a trip stands in its lifecycle.
///
/// The end timestamp only exists on `Closed`, so "ended iff closed" holds by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum TripStatus {
    /// Accepting samples and hazards.
    Open,

    /// Finalized. No further mutation is accepted.
    Closed {
        /// When the trip was finalized.
        ended_at: Timestamp,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_trip_has_zeroed_aggregates() {
        let trip = Trip::open("Asha".into(), "Pune".into(), "Mumbai".into(), Timestamp::now());

        assert!(trip.is_open());
        assert_eq!(trip.distance_km, 0.0);
        assert_eq!(trip.speed_kmh, 0.0);
        assert_eq!(trip.samples, 0);
        assert!(trip.ended_at().is_none());
    }

    #[test]
    fn trip_id_round_trips_through_string() {
        let id = TripId::new();
        let parsed: TripId = id.to_string().parse().unwrap();

        assert_eq!(parsed, id);
        assert_eq!(id.short().len(), 8);
    }

    #[test]
    fn closed_status_serializes_with_tag() {
        let status = TripStatus::Closed {
            ended_at: Timestamp::new(1_700_000_000, 0).unwrap(),
        };
        let json = serde_json::to_value(status).unwrap();

        assert_eq!(json["state"], "closed");
        assert!(json["ended_at"].is_string());
    }
}
