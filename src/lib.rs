//! RoadGuard: trip telemetry aggregation.
//!
//! Vehicle sensor units stream readings for an in-progress trip. The engine
//! keeps running aggregates per trip, logs detected road hazards, and once a
//! trip is finalized assembles an immutable report for whatever renders it.
//!
//! ```text
//! create_trip ─▶ record_sample / append ─▶ finalize ─▶ build_report
//!                (TripLedger)  (HazardLog)  (TripLedger) (ReportAssembler)
//! ```

pub mod error;
pub mod hazard_log;
pub mod ingress;
pub mod ledger;
pub mod model;
pub mod report;
pub mod storage;
pub mod telemetry;

pub use error::{Result, TelemetryError};
pub use hazard_log::HazardLog;
pub use ingress::TelemetryPayload;
pub use ledger::TripLedger;
pub use report::ReportAssembler;
pub use telemetry::{FleetStats, Telemetry};
