//! Trip rows: insert, guarded updates, and load.
//!
//! Updates carry `status = 'open'` in their `WHERE` clause, so a row closed
//! by any connection is never written again.

use jiff::Timestamp;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::model::{Trip, TripId, TripStatus};

use super::{Result, StorageError};

const COLUMNS: &str = "id, driver, origin, destination, started_at, distance_km, speed_kmh, \
                       samples, last_sample_at, status, ended_at";

pub(super) fn insert_row(conn: &Connection, trip: &Trip) -> Result<()> {
    let (status, ended_at) = serialize_status(trip.status);
    let inserted = conn.execute(
        &format!(
            "INSERT OR IGNORE INTO trip ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        rusqlite::params![
            trip.id.to_string(),
            &trip.driver,
            &trip.origin,
            &trip.destination,
            trip.started_at.to_string(),
            trip.distance_km,
            trip.speed_kmh,
            sample_count(trip)?,
            trip.last_sample_at.map(|t| t.to_string()),
            status,
            ended_at,
        ],
    )?;
    if inserted == 0 {
        return Err(StorageError::TripAlreadyExists(trip.id));
    }
    Ok(())
}

pub(super) fn record_sample_row(
    conn: &Connection,
    trip_id: TripId,
    delta_km: f64,
    speed_kmh: f64,
    at: Timestamp,
) -> Result<Trip> {
    let tx = conn.unchecked_transaction()?;
    let rows = tx.execute(
        "UPDATE trip
         SET distance_km = distance_km + ?1, speed_kmh = ?2, samples = samples + 1,
             last_sample_at = ?3
         WHERE id = ?4 AND status = 'open'",
        rusqlite::params![delta_km, speed_kmh, at.to_string(), trip_id.to_string()],
    )?;
    if rows == 0 {
        return Err(refusal(&tx, trip_id)?);
    }
    let trip = load_row(&tx, trip_id)?.ok_or(StorageError::TripNotFound(trip_id))?;
    tx.commit()?;
    Ok(trip)
}

pub(super) fn close_row(conn: &Connection, trip_id: TripId, ended_at: Timestamp) -> Result<Trip> {
    let (status, ended_at) = serialize_status(TripStatus::Closed { ended_at });
    let tx = conn.unchecked_transaction()?;
    let rows = tx.execute(
        "UPDATE trip SET status = ?1, ended_at = ?2 WHERE id = ?3 AND status = 'open'",
        rusqlite::params![status, ended_at, trip_id.to_string()],
    )?;
    if rows == 0 {
        return Err(refusal(&tx, trip_id)?);
    }
    let trip = load_row(&tx, trip_id)?.ok_or(StorageError::TripNotFound(trip_id))?;
    tx.commit()?;
    Ok(trip)
}

pub(super) fn load_row(conn: &Connection, trip_id: TripId) -> Result<Option<Trip>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM trip WHERE id = ?1"),
        [trip_id.to_string()],
        RawTrip::from_row,
    )
    .optional()?
    .map(RawTrip::into_trip)
    .transpose()
}

/// Column values as read, before parsing identifiers and timestamps.
struct RawTrip {
    id: String,
    driver: String,
    origin: String,
    destination: String,
    started_at: String,
    distance_km: f64,
    speed_kmh: f64,
    samples: i64,
    last_sample_at: Option<String>,
    status: String,
    ended_at: Option<String>,
}

impl RawTrip {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            driver: row.get(1)?,
            origin: row.get(2)?,
            destination: row.get(3)?,
            started_at: row.get(4)?,
            distance_km: row.get(5)?,
            speed_kmh: row.get(6)?,
            samples: row.get(7)?,
            last_sample_at: row.get(8)?,
            status: row.get(9)?,
            ended_at: row.get(10)?,
        })
    }

    fn into_trip(self) -> Result<Trip> {
        let id = self
            .id
            .parse::<TripId>()
            .map_err(|e| StorageError::Corrupt(format!("invalid trip id: {e}")))?;
        let started_at = parse_timestamp("started_at", &self.started_at)?;
        let last_sample_at = self
            .last_sample_at
            .as_deref()
            .map(|s| parse_timestamp("last_sample_at", s))
            .transpose()?;
        let samples = u64::try_from(self.samples)
            .map_err(|_| StorageError::Corrupt(format!("negative sample count for trip {id}")))?;
        let status = deserialize_status(&self.status, self.ended_at.as_deref())?;

        Ok(Trip {
            id,
            driver: self.driver,
            origin: self.origin,
            destination: self.destination,
            started_at,
            distance_km: self.distance_km,
            speed_kmh: self.speed_kmh,
            samples,
            last_sample_at,
            status,
        })
    }
}

/// Why a guarded write to `trip_id` matched no row.
pub(super) fn refusal(conn: &Connection, trip_id: TripId) -> Result<StorageError> {
    let status = conn
        .query_row(
            "SELECT status FROM trip WHERE id = ?1",
            [trip_id.to_string()],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(match status.as_deref() {
        None => StorageError::TripNotFound(trip_id),
        Some("closed") => StorageError::TripClosed(trip_id),
        Some(other) => {
            StorageError::Corrupt(format!("trip {trip_id} refused a write in state {other}"))
        }
    })
}

fn sample_count(trip: &Trip) -> Result<i64> {
    i64::try_from(trip.samples)
        .map_err(|_| StorageError::Corrupt(format!("sample count overflow for trip {}", trip.id)))
}

pub(super) fn parse_timestamp(column: &str, value: &str) -> Result<Timestamp> {
    value
        .parse::<Timestamp>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

/// Converts a `TripStatus` to column values for the trip table.
fn serialize_status(status: TripStatus) -> (&'static str, Option<String>) {
    match status {
        TripStatus::Open => ("open", None),
        TripStatus::Closed { ended_at } => ("closed", Some(ended_at.to_string())),
    }
}

/// Reconstructs a `TripStatus` from trip table column values.
fn deserialize_status(status: &str, ended_at: Option<&str>) -> Result<TripStatus> {
    match status {
        "open" => Ok(TripStatus::Open),
        "closed" => {
            let ended_at = ended_at.ok_or_else(|| {
                StorageError::Corrupt("trip is closed but ended_at is null".into())
            })?;
            Ok(TripStatus::Closed {
                ended_at: parse_timestamp("ended_at", ended_at)?,
            })
        }
        other => Err(StorageError::Corrupt(format!("unknown trip status: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::storage::{SqliteStore, TripStore};

    fn test_store() -> (TempDir, SqliteStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("roadguard.sqlite")).unwrap();
        (dir, store)
    }

    fn sample_trip() -> Trip {
        Trip::open("Asha".into(), "Pune".into(), "Mumbai".into(), Timestamp::now())
    }

    #[test]
    fn insert_and_load_trip() {
        let (_dir, store) = test_store();
        let trip = sample_trip();

        store.insert_trip(&trip).unwrap();
        let loaded = store.load_trips().unwrap();

        assert_eq!(loaded, vec![trip]);
    }

    #[test]
    fn insert_duplicate_trip_fails() {
        let (_dir, store) = test_store();
        let trip = sample_trip();

        store.insert_trip(&trip).unwrap();
        let err = store.insert_trip(&trip).unwrap_err();

        assert!(matches!(err, StorageError::TripAlreadyExists(_)));
    }

    #[test]
    fn samples_and_close_persist() {
        let (_dir, store) = test_store();
        let trip = sample_trip();
        store.insert_trip(&trip).unwrap();
        let at = Timestamp::new(1_700_000_000, 0).unwrap();

        store.record_sample(trip.id, 10.0, 40.0, Timestamp::now()).unwrap();
        let sampled = store.record_sample(trip.id, 2.5, 48.0, at).unwrap();
        assert!((sampled.distance_km - 12.5).abs() < f64::EPSILON);
        assert!((sampled.speed_kmh - 48.0).abs() < f64::EPSILON);
        assert_eq!(sampled.samples, 2);
        assert_eq!(sampled.last_sample_at, Some(at));

        let closed = store.close_trip(trip.id, Timestamp::now()).unwrap();
        assert!(!closed.is_open());
        assert_eq!(store.load_trips().unwrap(), vec![closed]);
    }

    #[test]
    fn closed_row_is_never_rewritten() {
        let (_dir, store) = test_store();
        let trip = sample_trip();
        store.insert_trip(&trip).unwrap();
        let closed = store.close_trip(trip.id, Timestamp::now()).unwrap();

        let err = store
            .record_sample(trip.id, 5.0, 80.0, Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, StorageError::TripClosed(_)));
        let err = store.close_trip(trip.id, Timestamp::now()).unwrap_err();
        assert!(matches!(err, StorageError::TripClosed(_)));

        assert_eq!(store.load_trip(trip.id).unwrap(), Some(closed));
    }

    #[test]
    fn writes_to_unknown_trip_fail() {
        let (_dir, store) = test_store();
        let id = TripId::new();

        let err = store.record_sample(id, 1.0, 1.0, Timestamp::now()).unwrap_err();
        assert!(matches!(err, StorageError::TripNotFound(_)));
        let err = store.close_trip(id, Timestamp::now()).unwrap_err();
        assert!(matches!(err, StorageError::TripNotFound(_)));
        assert_eq!(store.load_trip(id).unwrap(), None);
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let err = deserialize_status("paused", None).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[test]
    fn closed_without_end_is_corrupt() {
        let err = deserialize_status("closed", None).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
