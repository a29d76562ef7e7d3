//! CLI interface for RoadGuard.
//!
//! Stands in for the collaborators around the engine: whoever starts a
//! trip, the ingress that relays device payloads, and whoever ends a trip
//! and hands the report to a renderer. Each subcommand is non-interactive:
//! arguments in, structured output out.
//!
//! Trip arguments take a full UUID or an unambiguous prefix.

mod format;
mod ingest;
mod trip;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use roadguard::Telemetry;
use roadguard::model::TripId;
use roadguard::storage::SqliteStore;

use crate::config::Config;

use trip::TripCommand;

/// RoadGuard: trip telemetry and road hazard reports.
#[derive(Debug, Parser)]
#[command(name = "roadguard", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Path to the `SQLite` database (overrides `ROADGUARD_DB` and config).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow: one trip
  1. roadguard trip start --driver "Asha" --from Pune --to Mumbai
     → prints a trip ID (e.g. 3f2a9c01-…)
  2. device readings, one JSON object per line:
     roadguard ingest readings.jsonl
  3. roadguard trip end 3f2 --out report.json

Reading format:
  {"trip_id": "…", "latitude": 18.52, "longitude": 73.85,
   "severity": "Unsafe", "speed": 42.0, "distance": 0.12}
  Omit "severity" for readings without a hazard."#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage trips: start, list, inspect, end.
    Trip {
        #[command(subcommand)]
        command: TripCommand,
    },

    /// Apply device readings from a JSON Lines file (or stdin).
    ///
    /// Each line is applied on its own; rejected lines are reported and
    /// the command exits non-zero if any were rejected.
    Ingest {
        /// Input file. Reads stdin when omitted or `-`.
        input: Option<PathBuf>,
    },

    /// Fleet-wide totals across all trips.
    Stats {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config) -> Result<(), String> {
    let cli = Cli::parse();
    let engine = open_engine(config, cli.db.as_deref())?;

    match cli.command {
        Command::Trip { command } => trip::run(&engine, command),
        Command::Ingest { input } => ingest::cmd_ingest(&engine, input.as_deref()),
        Command::Stats { json } => cmd_stats(&engine, json),
    }
}

fn open_engine(config: &Config, explicit: Option<&std::path::Path>) -> Result<Telemetry, String> {
    let path = config.database_path(explicit)?;
    debug!(path = %path.display(), "opening database");
    let store = SqliteStore::open(&path)
        .map_err(|e| format!("failed to open database {}: {e}", path.display()))?;
    Telemetry::open(Arc::new(store)).map_err(|e| format!("failed to load trips: {e}"))
}

fn cmd_stats(engine: &Telemetry, json: bool) -> Result<(), String> {
    let stats = engine.fleet_stats();
    if json {
        let out = serde_json::to_string_pretty(&stats)
            .map_err(|e| format!("failed to serialize stats: {e}"))?;
        println!("{out}");
    } else {
        print!("{}", format::fleet_stats(&stats));
    }
    Ok(())
}

/// Resolve a trip reference (full UUID or unambiguous prefix) to a trip ID.
fn resolve_trip(engine: &Telemetry, reference: &str) -> Result<TripId, String> {
    if reference.trim().is_empty() {
        return Err("trip reference must not be empty".to_string());
    }

    // Try full UUID first.
    if let Ok(id) = reference.parse::<TripId>() {
        return Ok(id);
    }

    // Try as a prefix match against all trips.
    let trips = engine.ledger().list_trips();
    let matches: Vec<TripId> = trips
        .iter()
        .map(|t| t.id)
        .filter(|id| id.to_string().starts_with(reference))
        .collect();

    match matches.as_slice() {
        [] => Err(format!("no trip matching '{reference}'")),
        [id] => Ok(*id),
        many => {
            let ids: Vec<String> = many.iter().map(TripId::short).collect();
            Err(format!(
                "'{reference}' is ambiguous, matches {} trips: {}",
                many.len(),
                ids.join(", ")
            ))
        }
    }
}
