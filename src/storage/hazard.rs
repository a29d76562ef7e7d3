//! Hazard rows: append and load, in insertion order.

use rusqlite::{Connection, OptionalExtension};

use crate::model::{HazardObservation, ObservationId, Position, Severity, TripId};

use super::trip::{parse_timestamp, refusal};
use super::{Result, StorageError};

/// Inserts the observation only while its trip row is open.
pub(super) fn insert_row(conn: &Connection, hazard: &HazardObservation) -> Result<()> {
    let inserted = conn.execute(
        "INSERT INTO hazard (id, trip_id, latitude, longitude, severity, speed_kmh, observed_at)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
         FROM trip WHERE id = ?2 AND status = 'open'",
        rusqlite::params![
            hazard.id.to_string(),
            hazard.trip_id.to_string(),
            hazard.position.latitude,
            hazard.position.longitude,
            hazard.severity.as_str(),
            hazard.speed_kmh,
            hazard.observed_at.to_string(),
        ],
    )?;
    if inserted == 0 {
        return Err(refusal(conn, hazard.trip_id)?);
    }
    Ok(())
}

pub(super) fn load_rows(conn: &Connection, trip_id: TripId) -> Result<Vec<HazardObservation>> {
    ensure_trip(conn, trip_id)?;
    let mut stmt = conn.prepare(
        "SELECT id, latitude, longitude, severity, speed_kmh, observed_at
         FROM hazard WHERE trip_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt
        .query_map([trip_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(id, latitude, longitude, severity, speed_kmh, observed_at)| {
            Ok(HazardObservation {
                id: id
                    .parse::<ObservationId>()
                    .map_err(|e| StorageError::Corrupt(format!("invalid hazard id: {e}")))?,
                trip_id,
                position: Position::new(latitude, longitude),
                severity: severity
                    .parse::<Severity>()
                    .map_err(|e| StorageError::Corrupt(e.to_string()))?,
                speed_kmh,
                observed_at: parse_timestamp("observed_at", &observed_at)?,
            })
        })
        .collect()
}

/// Distinguishes "unknown trip" from "trip with an empty log".
fn ensure_trip(conn: &Connection, trip_id: TripId) -> Result<()> {
    let found = conn
        .query_row(
            "SELECT 1 FROM trip WHERE id = ?1",
            [trip_id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    found.ok_or(StorageError::TripNotFound(trip_id))
}
