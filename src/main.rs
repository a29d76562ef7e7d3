mod cli;
mod config;

use std::{io, process};

use tracing_subscriber::EnvFilter;

use config::Config;

fn main() {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    // RUST_LOG wins; otherwise the configured level, otherwise warnings only.
    let fallback = config.log_level.as_deref().unwrap_or("warn");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = cli::run(&config) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
