//! Trip lifecycle commands: start, list, history, show, end, report.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;

use roadguard::Telemetry;
use roadguard::model::TripReport;

use super::{format, resolve_trip};

#[derive(Debug, Subcommand)]
pub enum TripCommand {
    /// Start a new trip. Prints the trip ID.
    Start {
        /// Who is driving.
        #[arg(long)]
        driver: String,

        /// Origin label.
        #[arg(long = "from")]
        origin: String,

        /// Destination label.
        #[arg(long = "to")]
        destination: String,
    },

    /// List all trips, newest first.
    List,

    /// List finalized trips, newest first.
    History,

    /// Show one trip's aggregates and hazard counts.
    Show {
        /// Trip ID: full UUID or unambiguous prefix.
        trip: String,
    },

    /// Finalize a trip and emit its report as JSON.
    End {
        /// Trip ID: full UUID or unambiguous prefix.
        trip: String,

        /// Write the report JSON to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Rebuild the report of an already finalized trip.
    Report {
        /// Trip ID: full UUID or unambiguous prefix.
        trip: String,

        /// Write the report JSON to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub(super) fn run(engine: &Telemetry, command: TripCommand) -> Result<(), String> {
    match command {
        TripCommand::Start {
            driver,
            origin,
            destination,
        } => cmd_start(engine, &driver, &origin, &destination),
        TripCommand::List => cmd_list(engine, false),
        TripCommand::History => cmd_list(engine, true),
        TripCommand::Show { trip } => cmd_show(engine, &trip),
        TripCommand::End { trip, out } => cmd_end(engine, &trip, out.as_deref()),
        TripCommand::Report { trip, out } => cmd_report(engine, &trip, out.as_deref()),
    }
}

fn cmd_start(
    engine: &Telemetry,
    driver: &str,
    origin: &str,
    destination: &str,
) -> Result<(), String> {
    let id = engine
        .ledger()
        .create_trip(driver, origin, destination)
        .map_err(|e| format!("failed to start trip: {e}"))?;

    println!("{id}");
    Ok(())
}

fn cmd_list(engine: &Telemetry, closed_only: bool) -> Result<(), String> {
    let mut trips = if closed_only {
        engine.ledger().closed_trips()
    } else {
        engine.ledger().list_trips()
    };

    if trips.is_empty() {
        println!("No trips");
        return Ok(());
    }

    trips.reverse();
    for t in &trips {
        println!("{}", format::trip_line(t));
    }
    Ok(())
}

fn cmd_show(engine: &Telemetry, reference: &str) -> Result<(), String> {
    let id = resolve_trip(engine, reference)?;
    let trip = engine.ledger().get_trip(id).map_err(|e| e.to_string())?;
    let counts = engine
        .hazards()
        .count_by_severity(id)
        .map_err(|e| e.to_string())?;

    print!("{}", format::trip_detail(&trip, &counts));
    Ok(())
}

fn cmd_end(engine: &Telemetry, reference: &str, out: Option<&Path>) -> Result<(), String> {
    let id = resolve_trip(engine, reference)?;
    let report = engine
        .end_trip(id)
        .map_err(|e| format!("failed to end trip: {e}"))?;

    eprintln!("Trip {} ended", id.short());
    emit_report(&report, out)
}

fn cmd_report(engine: &Telemetry, reference: &str, out: Option<&Path>) -> Result<(), String> {
    let id = resolve_trip(engine, reference)?;
    let report = engine
        .reports()
        .build_report(id)
        .map_err(|e| format!("failed to build report: {e}"))?;

    emit_report(&report, out)
}

fn emit_report(report: &TripReport, out: Option<&Path>) -> Result<(), String> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| format!("failed to serialize report: {e}"))?;

    match out {
        Some(path) => {
            fs::write(path, &json)
                .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
            eprintln!(
                "Report: {} hazard(s) over {:.2} km → {}",
                report.total_hazards,
                report.trip.distance_km,
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
