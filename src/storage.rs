//! Durable backing stores for trips and hazard logs.
//!
//! The engine keeps live state in memory and writes every accepted change
//! through a [`TripStore`] before applying it. Several engines may share one
//! store (one per CLI process over the same file), so the store enforces the
//! open/closed transition itself: a closed trip is never written again. Two
//! backends ship:
//!
//! - [`MemoryStore`]: process-local, for tests and throwaway runs.
//! - [`SqliteStore`]: a single database file with two tables:
//!
//! ```text
//! trip     one row per trip; samples and finalize only touch open rows
//! hazard   append-only, ordered by an autoincrement sequence
//! ```

mod hazard;
mod memory;
mod sqlite;
mod trip;

use std::io;

use jiff::Timestamp;

use crate::model::{HazardObservation, Trip, TripId};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("trip not found in store: {0}")]
    TripNotFound(TripId),

    #[error("trip already exists in store: {0}")]
    TripAlreadyExists(TripId),

    /// The stored trip is already closed, possibly by another writer.
    #[error("trip is closed in store: {0}")]
    TripClosed(TripId),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt store data: {0}")]
    Corrupt(String),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Persistence contract for the trip ledger and hazard log.
///
/// Writes against a stored trip succeed only while that trip is open and
/// fail with [`StorageError::TripClosed`] afterwards, whoever closed it.
/// Aggregates are updated in place by the store so concurrent writers never
/// overwrite each other's samples.
pub trait TripStore: Send + Sync {
    /// Records a newly created trip.
    fn insert_trip(&self, trip: &Trip) -> Result<()>;

    /// Adds one sample to an open trip and returns the stored record.
    fn record_sample(
        &self,
        trip_id: TripId,
        delta_km: f64,
        speed_kmh: f64,
        at: Timestamp,
    ) -> Result<Trip>;

    /// Moves an open trip to closed and returns the stored record.
    fn close_trip(&self, trip_id: TripId, ended_at: Timestamp) -> Result<Trip>;

    /// Appends one observation to an open trip's log.
    fn append_hazard(&self, hazard: &HazardObservation) -> Result<()>;

    /// Loads one trip, or `None` if the store has never seen it.
    fn load_trip(&self, trip_id: TripId) -> Result<Option<Trip>>;

    /// Loads every stored trip, in no particular order.
    fn load_trips(&self) -> Result<Vec<Trip>>;

    /// Loads a trip's observations in append order.
    fn load_hazards(&self, trip_id: TripId) -> Result<Vec<HazardObservation>>;
}
