//! Hazard types: road-surface anomalies detected during a trip.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TripId;

/// Unique identifier of a hazard observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservationId(Uuid);

impl ObservationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObservationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Classification bucket for a detected hazard.
///
/// This set grows as the detector learns new classes; every variant must
/// also be listed in [`Severity::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Passable without slowing down.
    Safe,

    /// Requires evasive action.
    Unsafe,
}

impl Severity {
    /// Every known severity, in report order.
    pub const ALL: [Severity; 2] = [Severity::Safe, Severity::Unsafe];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Unsafe => "Unsafe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Raised when a severity label matches none of the known classes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized severity: {0:?}")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

/// A geographic position in decimal degrees.
///
/// Only finiteness is checked; no range validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// One detected hazard, immutable once appended to a trip's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardObservation {
    pub id: ObservationId,
    pub trip_id: TripId,
    pub position: Position,
    pub severity: Severity,

    /// Vehicle speed when the hazard was detected, in km/h.
    pub speed_kmh: f64,

    pub observed_at: Timestamp,
}
