//! RoadGuard configuration.
//!
//! Loaded from `~/.roadguard/config.toml`. Every key is optional and a
//! missing file means defaults.
//!
//! The database path is resolved through a chain:
//!
//! 1. `--db <path>`: explicit per-command override
//! 2. `ROADGUARD_DB` env var
//! 3. `database = "..."` in the config file
//! 4. `~/.roadguard/roadguard.sqlite`

use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;

use roadguard::storage::SqliteStore;

/// Environment variable naming the database file.
pub const DB_ENV: &str = "ROADGUARD_DB";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Path to the `SQLite` database.
    pub database: Option<PathBuf>,

    /// Default tracing filter when `RUST_LOG` is unset (e.g. `"info"`).
    pub log_level: Option<String>,
}

impl Config {
    /// Load config from `~/.roadguard/config.toml`, or defaults if absent.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.roadguard/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".roadguard").join("config.toml"))
    }

    /// Resolve the database path from the tiered chain.
    pub fn database_path(&self, explicit: Option<&Path>) -> Result<PathBuf, String> {
        let from_env = env::var_os(DB_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);
        self.resolve_database(explicit, from_env)
    }

    fn resolve_database(
        &self,
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
    ) -> Result<PathBuf, String> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = from_env {
            return Ok(path);
        }
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        SqliteStore::default_path().ok_or_else(|| {
            format!("could not determine home directory; pass --db or set {DB_ENV}")
        })
    }
}
