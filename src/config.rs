//! Application configuration using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (`AppConfig::default()`)
//! 2. `config/rssi_logger.toml` (or the path given on the command line)
//! 3. Environment variables prefixed with `RSSI_LOGGER_`, nested keys split on `__`
//!
//! Serial framing is fixed by the transceiver firmware and lives in [`crate::source::serial`].
//!
//! # Example
//! ```no_run
//! use rssi_logger::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! println!("Logs go to {}", config.storage.output_dir.display());
//! # Ok::<(), figment::Error>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/rssi_logger.toml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Where logs and the summary table are stored
    pub storage: StorageConfig,
    /// Sampling choices offered to the operator
    pub acquisition: AcquisitionConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Tracing output format (pretty, compact, json)
    pub log_format: String,
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<name>.txt` logs
    pub output_dir: PathBuf,
    /// Cumulative summary table, resolved against `output_dir` when relative
    pub stats_file: PathBuf,
}

/// Acquisition choices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Durations (seconds) the operator may pick from
    pub allowed_durations_secs: Vec<u32>,
    /// Duration used when none is given
    pub default_duration_secs: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            application: ApplicationConfig {
                name: "LoRa RSSI Logger".to_string(),
                log_level: "info".to_string(),
                log_format: "compact".to_string(),
            },
            storage: StorageConfig {
                output_dir: PathBuf::from("."),
                stats_file: PathBuf::from("stats.csv"),
            },
            acquisition: AcquisitionConfig {
                allowed_durations_secs: (10..=45).step_by(5).collect(),
                default_duration_secs: 20,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file and environment variables
    ///
    /// Environment variables override the file, e.g.
    /// `RSSI_LOGGER_STORAGE__OUTPUT_DIR=/mnt/field`.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path. A missing file is not an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("RSSI_LOGGER_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            ));
        }

        if self.storage.stats_file.as_os_str().is_empty() {
            return Err("stats_file cannot be empty".to_string());
        }

        let durations = &self.acquisition.allowed_durations_secs;
        if durations.is_empty() {
            return Err("allowed_durations_secs cannot be empty".to_string());
        }
        if durations.contains(&0) {
            return Err("allowed_durations_secs must be positive".to_string());
        }
        if !durations.contains(&self.acquisition.default_duration_secs) {
            return Err(format!(
                "default_duration_secs {} is not one of the allowed durations {:?}",
                self.acquisition.default_duration_secs, durations
            ));
        }

        Ok(())
    }

    /// Whether `secs` is one of the operator-selectable durations.
    pub fn is_allowed_duration(&self, secs: u32) -> bool {
        self.acquisition.allowed_durations_secs.contains(&secs)
    }

    /// Full path of the summary table.
    pub fn stats_path(&self) -> PathBuf {
        if self.storage.stats_file.is_absolute() {
            self.storage.stats_file.clone()
        } else {
            self.storage.output_dir.join(&self.storage.stats_file)
        }
    }
}
