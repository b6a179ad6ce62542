//! Lookout configuration.
//!
//! Loaded from `~/.lookout/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

fn default_alert_window_hours() -> i64 {
    24
}

/// Lookout configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Root of the received archive tree (date-partitioned).
    pub received_dir: PathBuf,

    /// Where successfully ingested archives are moved to.
    pub treated_dir: PathBuf,

    /// Where non-conforming and failed files are moved to.
    pub error_dir: PathBuf,

    /// Path of the `SQLite` database file.
    pub database: PathBuf,

    /// Look-back window for the missing-report detector, in hours.
    #[serde(default = "default_alert_window_hours")]
    pub alert_window_hours: i64,
}

impl Config {
    /// Load config from the given path, or `~/.lookout/config.toml`.
    /// Returns an error if the file is missing or invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path().ok_or("could not determine home directory")?,
        };

        if !path.exists() {
            return Err(format!(
                "no config file found at {}\n\
                 Create one with at minimum:\n\n\
                 received-dir = \"/data/logbook/received\"\n\
                 treated-dir = \"/data/logbook/treated\"\n\
                 error-dir = \"/data/logbook/error\"\n\
                 database = \"/data/lookout.sqlite\"",
                path.display()
            ));
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        if config.alert_window_hours <= 0 {
            return Err(format!(
                "alert-window-hours must be positive in {}",
                path.display()
            ));
        }

        Ok(config)
    }

    /// The default config file path: `~/.lookout/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lookout").join("config.toml"))
    }
}
