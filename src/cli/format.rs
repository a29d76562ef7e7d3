//! Human-readable formatting for trips and fleet totals.

use std::fmt::Write;

use roadguard::FleetStats;
use roadguard::model::{SeverityCounts, Trip};

/// Short state label for a trip.
pub(super) fn state_label(trip: &Trip) -> &'static str {
    if trip.is_open() { "open" } else { "closed" }
}

/// One-line listing: short id, state, driver, route, distance.
pub(super) fn trip_line(trip: &Trip) -> String {
    format!(
        "{}  [{}]  {}  {} → {}  {:.2} km",
        trip.id.short(),
        state_label(trip),
        trip.driver,
        trip.origin,
        trip.destination,
        trip.distance_km
    )
}

/// Multi-line detail block for `trip show`.
pub(super) fn trip_detail(trip: &Trip, counts: &SeverityCounts) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Trip:        {}", trip.id);
    let _ = writeln!(out, "State:       {}", state_label(trip));
    let _ = writeln!(out, "Driver:      {}", trip.driver);
    let _ = writeln!(out, "Route:       {} → {}", trip.origin, trip.destination);
    let _ = writeln!(out, "Started:     {}", trip.started_at);
    if let Some(ended_at) = trip.ended_at() {
        let _ = writeln!(out, "Ended:       {ended_at}");
    }
    let _ = writeln!(out, "Distance:    {:.2} km", trip.distance_km);
    let _ = writeln!(out, "Last speed:  {:.2} km/h", trip.speed_kmh);
    let _ = writeln!(out, "Samples:     {}", trip.samples);
    let _ = writeln!(out, "Hazards:     {}", counts.values().sum::<usize>());
    for (severity, n) in counts {
        let _ = writeln!(out, "  {severity:<10} {n}");
    }
    out
}

/// Table of fleet-wide totals for `stats`.
pub(super) fn fleet_stats(stats: &FleetStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Trips:       {} ({} open)", stats.total_trips, stats.open_trips);
    let _ = writeln!(out, "Distance:    {:.2} km", stats.total_distance_km);
    let _ = writeln!(out, "Hazards:     {}", stats.total_hazards);
    for (severity, n) in &stats.hazards_by_severity {
        let _ = writeln!(out, "  {severity:<10} {n}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    use roadguard::model::{Severity, TripStatus, tally};

    fn trip() -> Trip {
        let mut t = Trip::open("Asha".into(), "Pune".into(), "Mumbai".into(), Timestamp::now());
        t.distance_km = 12.345;
        t
    }

    #[test]
    fn trip_line_shows_route_and_distance() {
        let t = trip();
        let line = trip_line(&t);

        assert!(line.starts_with(&t.id.short()));
        assert!(line.contains("[open]"));
        assert!(line.contains("Pune → Mumbai"));
        assert!(line.contains("12.35 km"));
    }

    #[test]
    fn detail_includes_end_only_when_closed() {
        let mut t = trip();
        let counts = tally([]);
        assert!(!trip_detail(&t, &counts).contains("Ended:"));

        t.status = TripStatus::Closed {
            ended_at: Timestamp::now(),
        };
        let detail = trip_detail(&t, &counts);
        assert!(detail.contains("Ended:"));
        assert!(detail.contains("State:       closed"));
    }

    #[test]
    fn fleet_stats_lists_every_severity() {
        let stats = FleetStats {
            total_trips: 3,
            open_trips: 1,
            total_distance_km: 10.0,
            total_hazards: 0,
            hazards_by_severity: tally([]),
        };
        let table = fleet_stats(&stats);

        for sev in Severity::ALL {
            assert!(table.contains(sev.as_str()));
        }
        assert!(table.contains("3 (1 open)"));
    }
}
