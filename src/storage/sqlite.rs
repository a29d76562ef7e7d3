//! `SQLite`-backed store: one database file for all trips.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use jiff::Timestamp;
use rusqlite::Connection;

use crate::model::{HazardObservation, Trip, TripId};

use super::{Result, TripStore, hazard, trip};

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS trip (
        id              TEXT PRIMARY KEY,
        driver          TEXT NOT NULL,
        origin          TEXT NOT NULL,
        destination     TEXT NOT NULL,
        started_at      TEXT NOT NULL,
        distance_km     REAL NOT NULL,
        speed_kmh       REAL NOT NULL,
        samples         INTEGER NOT NULL,
        last_sample_at  TEXT,
        status          TEXT NOT NULL,
        ended_at        TEXT
    );

    CREATE TABLE IF NOT EXISTS hazard (
        seq             INTEGER PRIMARY KEY AUTOINCREMENT,
        id              TEXT NOT NULL UNIQUE,
        trip_id         TEXT NOT NULL REFERENCES trip(id),
        latitude        REAL NOT NULL,
        longitude       REAL NOT NULL,
        severity        TEXT NOT NULL,
        speed_kmh       REAL NOT NULL,
        observed_at     TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS hazard_by_trip ON hazard (trip_id, seq);
";

/// How long a write waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`TripStore`] persisted to a single `SQLite` file.
///
/// The connection is shared behind a mutex; the engine's per-trip locking
/// sits above this and is unaffected by it. Other processes may hold their
/// own connection to the same file.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema.
    ///
    /// Parent directories are created if they don't exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Returns the default database path: `~/.roadguard/roadguard.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".roadguard").join("roadguard.sqlite"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TripStore for SqliteStore {
    fn insert_trip(&self, t: &Trip) -> Result<()> {
        trip::insert_row(&self.conn(), t)
    }

    fn record_sample(
        &self,
        trip_id: TripId,
        delta_km: f64,
        speed_kmh: f64,
        at: Timestamp,
    ) -> Result<Trip> {
        trip::record_sample_row(&self.conn(), trip_id, delta_km, speed_kmh, at)
    }

    fn close_trip(&self, trip_id: TripId, ended_at: Timestamp) -> Result<Trip> {
        trip::close_row(&self.conn(), trip_id, ended_at)
    }

    fn append_hazard(&self, h: &HazardObservation) -> Result<()> {
        hazard::insert_row(&self.conn(), h)
    }

    fn load_trip(&self, trip_id: TripId) -> Result<Option<Trip>> {
        trip::load_row(&self.conn(), trip_id)
    }

    fn load_trips(&self) -> Result<Vec<Trip>> {
        trip::load_rows(&self.conn())
    }

    fn load_hazards(&self, trip_id: TripId) -> Result<Vec<HazardObservation>> {
        hazard::load_rows(&self.conn(), trip_id)
    }
}
