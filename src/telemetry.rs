//! The engine as its collaborators see it.
//!
//! [`Telemetry`] owns one ledger, the hazard log and report assembler over
//! it, and the store behind all three. There is no process-wide state:
//! construct one per store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::hazard_log::{self, HazardLog};
use crate::ingress::TelemetryPayload;
use crate::ledger::{TripLedger, lock_slot};
use crate::model::{ObservationId, SeverityCounts, TripId, TripReport, tally};
use crate::report::ReportAssembler;
use crate::storage::{MemoryStore, TripStore};

pub struct Telemetry {
    ledger: Arc<TripLedger>,
    hazards: HazardLog,
    reports: ReportAssembler,
}

/// Fleet-wide totals across every trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total_trips: usize,
    pub open_trips: usize,
    pub total_distance_km: f64,
    pub total_hazards: usize,
    pub hazards_by_severity: SeverityCounts,
}

impl Telemetry {
    /// Opens the engine over `store`, loading whatever it already holds.
    pub fn open(store: Arc<dyn TripStore>) -> Result<Self> {
        Ok(Self::from_ledger(TripLedger::open(store)?))
    }

    /// An engine over a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_ledger(TripLedger::new(Arc::new(MemoryStore::new())))
    }

    fn from_ledger(ledger: TripLedger) -> Self {
        let ledger = Arc::new(ledger);
        Self {
            hazards: HazardLog::new(ledger.clone()),
            reports: ReportAssembler::new(ledger.clone()),
            ledger,
        }
    }

    pub fn ledger(&self) -> &TripLedger {
        &self.ledger
    }

    pub fn hazards(&self) -> &HazardLog {
        &self.hazards
    }

    pub fn reports(&self) -> &ReportAssembler {
        &self.reports
    }

    /// Applies one device payload: the sample, then its hazard if present.
    ///
    /// Both steps run under one hold of the trip's lock, so a concurrent
    /// finalize lands either before the whole payload or after it. Every
    /// argument is checked before the first write.
    pub fn ingest(&self, payload: &TelemetryPayload) -> Result<Option<ObservationId>> {
        let hazard = payload.hazard()?;

        self.ledger.with_slot(payload.trip_id, |slot| {
            slot.ensure_open()?;
            if let Some(h) = hazard {
                hazard_log::validate(h.position, payload.speed)?;
            }

            self.ledger
                .apply_sample(slot, payload.distance, payload.speed, payload.timestamp)?;
            hazard
                .map(|h| {
                    self.hazards.append_locked(
                        slot,
                        h.position,
                        h.severity,
                        payload.speed,
                        payload.timestamp,
                    )
                })
                .transpose()
        })
    }

    /// Finalizes the trip and builds its report.
    pub fn end_trip(&self, trip_id: TripId) -> Result<TripReport> {
        self.ledger.finalize(trip_id)?;
        let report = self.reports.build_report(trip_id)?;
        info!(
            trip = %trip_id,
            distance_km = report.trip.distance_km,
            hazards = report.total_hazards,
            "trip ended"
        );
        Ok(report)
    }

    /// Totals across every trip, open or closed.
    pub fn fleet_stats(&self) -> FleetStats {
        let mut stats = FleetStats {
            total_trips: 0,
            open_trips: 0,
            total_distance_km: 0.0,
            total_hazards: 0,
            hazards_by_severity: tally([]),
        };
        for handle in self.ledger.handles() {
            let slot = lock_slot(&handle);
            stats.total_trips += 1;
            if slot.trip.is_open() {
                stats.open_trips += 1;
            }
            stats.total_distance_km += slot.trip.distance_km;
            stats.total_hazards += slot.hazards.len();
            for (severity, n) in tally(&slot.hazards) {
                *stats.hazards_by_severity.entry(severity).or_insert(0) += n;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use tempfile::TempDir;

    use crate::error::TelemetryError;
    use crate::model::Severity;
    use crate::storage::SqliteStore;

    fn reading(
        trip_id: TripId,
        distance: f64,
        speed: f64,
        severity: Option<&str>,
    ) -> TelemetryPayload {
        TelemetryPayload {
            trip_id,
            latitude: Some(18.52),
            longitude: Some(73.85),
            severity: severity.map(String::from),
            speed,
            distance,
            timestamp: None,
        }
    }

    #[test]
    fn ingest_applies_sample_and_hazard() {
        let engine = Telemetry::in_memory();
        let trip = engine.ledger().create_trip("Asha", "Pune", "Mumbai").unwrap();

        assert!(engine.ingest(&reading(trip, 1.2, 40.0, None)).unwrap().is_none());
        let id = engine
            .ingest(&reading(trip, 0.8, 55.0, Some("Unsafe")))
            .unwrap()
            .unwrap();

        let snapshot = engine.ledger().get_trip(trip).unwrap();
        assert!((snapshot.distance_km - 2.0).abs() < 1e-9);
        assert_eq!(snapshot.samples, 2);
        let log = engine.hazards().list_by_trip(trip).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, id);
        assert!((log[0].speed_kmh - 55.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejected_payload_changes_nothing() {
        let engine = Telemetry::in_memory();
        let trip = engine.ledger().create_trip("Asha", "Pune", "Mumbai").unwrap();
        let before = engine.ledger().get_trip(trip).unwrap();

        let mut bad_position = reading(trip, 1.0, 30.0, Some("Safe"));
        bad_position.latitude = Some(f64::NAN);
        let mut no_coords = reading(trip, 1.0, 30.0, Some("Safe"));
        no_coords.longitude = None;

        for payload in [
            reading(trip, -1.0, 30.0, Some("Safe")),
            reading(trip, 1.0, 30.0, Some("Pothole")),
            bad_position,
            no_coords,
        ] {
            let err = engine.ingest(&payload).unwrap_err();
            assert!(matches!(err, TelemetryError::InvalidInput(_)), "{err}");
        }

        assert_eq!(engine.ledger().get_trip(trip).unwrap(), before);
        assert!(engine.hazards().list_by_trip(trip).unwrap().is_empty());
    }

    #[test]
    fn ingest_for_unknown_or_closed_trip_fails() {
        let engine = Telemetry::in_memory();
        let trip = engine.ledger().create_trip("Asha", "Pune", "Mumbai").unwrap();
        engine.ledger().finalize(trip).unwrap();

        let err = engine
            .ingest(&reading(TripId::new(), 1.0, 30.0, Some("Safe")))
            .unwrap_err();
        assert!(matches!(err, TelemetryError::TripNotFound(_)));

        let err = engine.ingest(&reading(trip, 1.0, 30.0, None)).unwrap_err();
        assert!(matches!(err, TelemetryError::TripClosed(_)));
    }

    #[test]
    fn end_trip_finalizes_and_reports() {
        let engine = Telemetry::in_memory();
        let trip = engine.ledger().create_trip("Asha", "Pune", "Mumbai").unwrap();
        engine.ingest(&reading(trip, 1.2, 40.0, None)).unwrap();
        engine.ingest(&reading(trip, 0.8, 55.0, Some("Unsafe"))).unwrap();

        let report = engine.end_trip(trip).unwrap();

        assert!((report.trip.distance_km - 2.0).abs() < 1e-9);
        assert!((report.trip.speed_kmh - 55.0).abs() < f64::EPSILON);
        assert_eq!(report.total_hazards, 1);
        assert_eq!(report.count(Severity::Unsafe), 1);
        assert_eq!(report.count(Severity::Safe), 0);

        assert!(matches!(engine.end_trip(trip), Err(TelemetryError::TripClosed(_))));
        assert_eq!(engine.reports().build_report(trip).unwrap(), report);
    }

    #[test]
    fn fleet_stats_cover_all_trips() {
        let engine = Telemetry::in_memory();
        let a = engine.ledger().create_trip("Asha", "Pune", "Mumbai").unwrap();
        let b = engine.ledger().create_trip("Ravi", "Nashik", "Surat").unwrap();
        engine.ingest(&reading(a, 2.0, 40.0, Some("Unsafe"))).unwrap();
        engine.ingest(&reading(b, 3.0, 50.0, Some("Safe"))).unwrap();
        engine.ingest(&reading(b, 1.0, 45.0, Some("Unsafe"))).unwrap();
        engine.ledger().finalize(a).unwrap();

        let stats = engine.fleet_stats();

        assert_eq!(stats.total_trips, 2);
        assert_eq!(stats.open_trips, 1);
        assert!((stats.total_distance_km - 6.0).abs() < 1e-9);
        assert_eq!(stats.total_hazards, 3);
        assert_eq!(stats.hazards_by_severity[&Severity::Unsafe], 2);
        assert_eq!(stats.hazards_by_severity[&Severity::Safe], 1);
    }

    #[test]
    fn fleet_stats_of_empty_engine() {
        let stats = Telemetry::in_memory().fleet_stats();

        assert_eq!(stats.total_trips, 0);
        assert_eq!(stats.total_hazards, 0);
        assert!(stats.hazards_by_severity.values().all(|&n| n == 0));
    }

    #[test]
    fn concurrent_payloads_keep_counts_consistent() {
        let engine = Telemetry::in_memory();
        let trip = engine.ledger().create_trip("Asha", "Pune", "Mumbai").unwrap();

        thread::scope(|s| {
            for worker in 0..4 {
                let engine = &engine;
                s.spawn(move || {
                    let severity = if worker % 2 == 0 { "Safe" } else { "Unsafe" };
                    for _ in 0..50 {
                        engine.ingest(&reading(trip, 0.25, 30.0, Some(severity))).unwrap();
                    }
                });
            }
        });

        let counts = engine.hazards().count_by_severity(trip).unwrap();
        assert_eq!(counts[&Severity::Safe], 100);
        assert_eq!(counts[&Severity::Unsafe], 100);
        assert_eq!(engine.ledger().get_trip(trip).unwrap().samples, 200);
        let logged = engine.hazards().list_by_trip(trip).unwrap().len();
        assert_eq!(counts.values().sum::<usize>(), logged);
    }

    #[test]
    fn ingest_cannot_reopen_trip_ended_elsewhere() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roadguard.sqlite");
        let open = || Telemetry::open(Arc::new(SqliteStore::open(&path).unwrap())).unwrap();

        let ingest = open();
        let trip = ingest.ledger().create_trip("Asha", "Pune", "Mumbai").unwrap();
        ingest.ingest(&reading(trip, 1.0, 35.0, Some("Safe"))).unwrap();

        let report = open().end_trip(trip).unwrap();

        for payload in [
            reading(trip, 5.0, 80.0, None),
            reading(trip, 5.0, 80.0, Some("Unsafe")),
        ] {
            let err = ingest.ingest(&payload).unwrap_err();
            assert!(matches!(err, TelemetryError::TripClosed(_)), "{err}");
        }
        assert_eq!(ingest.reports().build_report(trip).unwrap(), report);

        let reopened = open();
        assert_eq!(reopened.reports().build_report(trip).unwrap(), report);
        assert!((report.trip.distance_km - 1.0).abs() < f64::EPSILON);
        assert_eq!(report.total_hazards, 1);
    }

    #[test]
    fn reopened_engine_rebuilds_identical_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roadguard.sqlite");

        let (trip, report) = {
            let engine = Telemetry::open(Arc::new(SqliteStore::open(&path).unwrap())).unwrap();
            let trip = engine.ledger().create_trip("Asha", "Pune", "Mumbai").unwrap();
            engine.ingest(&reading(trip, 1.0, 35.0, Some("Safe"))).unwrap();
            engine.ingest(&reading(trip, 2.0, 45.0, Some("Unsafe"))).unwrap();
            (trip, engine.end_trip(trip).unwrap())
        };

        let engine = Telemetry::open(Arc::new(SqliteStore::open(&path).unwrap())).unwrap();
        assert_eq!(engine.reports().build_report(trip).unwrap(), report);
    }
}
