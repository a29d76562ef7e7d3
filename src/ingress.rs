//! Inbound device payloads.
//!
//! A sensor unit reports one JSON object per reading:
//!
//! ```json
//! {"trip_id": "…", "latitude": 18.52, "longitude": 73.85,
//!  "severity": "Unsafe", "speed": 42.0, "distance": 0.12}
//! ```
//!
//! `severity` marks a detected hazard; readings without it only advance the
//! trip's aggregates. Payloads are checked here, before anything reaches the
//! ledger.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TelemetryError};
use crate::model::{Position, Severity, TripId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub trip_id: TripId,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    /// Present only when the reading detected a hazard.
    #[serde(default)]
    pub severity: Option<String>,

    /// Current speed, km/h.
    pub speed: f64,

    /// Distance travelled since the previous reading, km.
    pub distance: f64,

    /// Device clock; arrival time is used when absent.
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

/// The hazard part of a payload, once validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedHazard {
    pub position: Position,
    pub severity: Severity,
}

impl TelemetryPayload {
    /// Parses one JSON payload.
    pub fn from_json(line: &str) -> Result<Self> {
        serde_json::from_str(line)
            .map_err(|e| TelemetryError::InvalidInput(format!("malformed payload: {e}")))
    }

    /// The hazard carried by this payload, if any.
    ///
    /// A severity without both coordinates, or an unknown severity label,
    /// is rejected rather than dropped.
    pub fn hazard(&self) -> Result<Option<DetectedHazard>> {
        let Some(label) = &self.severity else {
            return Ok(None);
        };
        let severity: Severity = label.parse()?;
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return Err(TelemetryError::InvalidInput(
                "hazard payload is missing latitude or longitude".into(),
            ));
        };
        Ok(Some(DetectedHazard {
            position: Position::new(latitude, longitude),
            severity,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> TelemetryPayload {
        TelemetryPayload::from_json(json).unwrap()
    }

    #[test]
    fn parses_device_payload() {
        let id = TripId::new();
        let p = payload(&format!(
            r#"{{"trip_id":"{id}","latitude":18.52,"longitude":73.85,
                "severity":"Unsafe","speed":42.0,"distance":0.12}}"#
        ));

        assert_eq!(p.trip_id, id);
        assert!(p.timestamp.is_none());
        let hazard = p.hazard().unwrap().unwrap();
        assert_eq!(hazard.severity, Severity::Unsafe);
        assert_eq!(hazard.position, Position::new(18.52, 73.85));
    }

    #[test]
    fn reading_without_severity_has_no_hazard() {
        let id = TripId::new();
        let p = payload(&format!(r#"{{"trip_id":"{id}","speed":30,"distance":0.5}}"#));

        assert!(p.hazard().unwrap().is_none());
    }

    #[test]
    fn hazard_without_coordinates_is_rejected() {
        let id = TripId::new();
        let p = payload(&format!(
            r#"{{"trip_id":"{id}","latitude":18.52,"severity":"Safe","speed":30,"distance":0.5}}"#
        ));

        assert!(matches!(p.hazard(), Err(TelemetryError::InvalidInput(_))));
    }

    #[test]
    fn unknown_severity_is_rejected() {
        let id = TripId::new();
        let p = payload(&format!(
            r#"{{"trip_id":"{id}","latitude":1,"longitude":2,"severity":"Bumpy","speed":30,"distance":0.5}}"#
        ));

        assert!(matches!(p.hazard(), Err(TelemetryError::InvalidInput(_))));
    }

    #[test]
    fn malformed_json_is_rejected() {
        for bad in [
            "not json",
            r#"{"trip_id":"nope","speed":1,"distance":1}"#,
            r#"{"speed":1,"distance":1}"#,
        ] {
            assert!(matches!(
                TelemetryPayload::from_json(bad),
                Err(TelemetryError::InvalidInput(_))
            ));
        }
    }
}
