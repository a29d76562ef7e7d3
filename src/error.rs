//! Error taxonomy for the telemetry engine.
//!
//! Every variant is terminal for the call that raised it. Nothing is retried
//! internally and nothing is clamped into range.

use crate::model::{TripId, UnknownSeverity};
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Malformed or out-of-range argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("trip not found: {0}")]
    TripNotFound(TripId),

    /// Mutation attempted after the trip was finalized.
    #[error("trip {0} is closed")]
    TripClosed(TripId),

    /// Report requested before the trip was finalized.
    #[error("trip {0} is still open")]
    TripStillOpen(TripId),

    /// The backing store refused the write or returned bad data.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
}

/// A trip the store reports closed is closed, whichever writer closed it.
impl From<StorageError> for TelemetryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TripClosed(id) => Self::TripClosed(id),
            other => Self::Storage(other),
        }
    }
}

impl From<UnknownSeverity> for TelemetryError {
    fn from(err: UnknownSeverity) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, TelemetryError>;

/// Rejects empty or whitespace-only labels.
pub(crate) fn require_label(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TelemetryError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Rejects negative, NaN, and infinite magnitudes.
pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(TelemetryError::InvalidInput(format!(
            "{field} must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}
