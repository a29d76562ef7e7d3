//! Core data model for RoadGuard.
//!
//! These types describe what the engine tracks: trips and their running
//! aggregates, hazard observations, and the report built once a trip closes.

mod hazard;
mod report;
mod trip;

pub use hazard::{HazardObservation, ObservationId, Position, Severity, UnknownSeverity};
pub use report::{SeverityCounts, TripReport, tally};
pub use trip::{Trip, TripId, TripStatus};
