//! Telemetry ingress: apply device readings from JSON Lines.

use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use tracing::warn;

use roadguard::{Telemetry, TelemetryPayload};

/// Outcome of one ingest run.
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct IngestSummary {
    pub applied: usize,
    pub hazards: usize,
    pub rejected: usize,
}

pub(super) fn cmd_ingest(engine: &Telemetry, input: Option<&Path>) -> Result<(), String> {
    let summary = match input {
        None => ingest_lines(engine, io::stdin().lock()),
        Some(path) if path == Path::new("-") => ingest_lines(engine, io::stdin().lock()),
        Some(path) => {
            let file = fs::File::open(path)
                .map_err(|e| format!("failed to open {}: {e}", path.display()))?;
            ingest_lines(engine, io::BufReader::new(file))
        }
    }
    .map_err(|e| format!("failed to read input: {e}"))?;

    eprintln!(
        "Applied {} reading(s), {} hazard(s); rejected {}",
        summary.applied, summary.hazards, summary.rejected
    );
    if summary.rejected > 0 {
        return Err(format!("{} reading(s) rejected", summary.rejected));
    }
    Ok(())
}

/// Applies each non-blank line independently. A bad line never stops the run.
pub(super) fn ingest_lines(
    engine: &Telemetry,
    reader: impl BufRead,
) -> io::Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let lineno = index + 1;
        let result = TelemetryPayload::from_json(&line).and_then(|p| engine.ingest(&p));
        match result {
            Ok(hazard) => {
                summary.applied += 1;
                if hazard.is_some() {
                    summary.hazards += 1;
                }
            }
            Err(e) => {
                summary.rejected += 1;
                warn!(line = lineno, error = %e, "reading rejected");
                eprintln!("line {lineno}: {e}");
            }
        }
    }
    Ok(summary)
}
