//! Immutable parameters of one acquisition session.

use crate::error::{AppResult, LoggerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Value recorded for a coordinate the operator left blank.
pub const COORDINATE_SENTINEL: &str = "-00.000000";

/// Extension appended to the operator-supplied log name.
pub const LOG_EXTENSION: &str = "txt";

/// Path of the log called `name` inside `dir`.
pub fn log_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", name, LOG_EXTENSION))
}

/// Latitude/longitude of one transceiver, as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationCoordinates {
    /// Decimal latitude
    pub latitude: String,
    /// Decimal longitude
    pub longitude: String,
}

impl StationCoordinates {
    /// Create a coordinate pair
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }

    /// Copy with blank values replaced by [`COORDINATE_SENTINEL`].
    pub fn normalized(&self) -> Self {
        Self {
            latitude: normalize_coordinate(&self.latitude),
            longitude: normalize_coordinate(&self.longitude),
        }
    }
}

/// Positions of both transceivers of a range test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Transceiver 1 (LoRa 1)
    pub station1: StationCoordinates,
    /// Transceiver 2 (LoRa 2)
    pub station2: StationCoordinates,
}

impl Coordinates {
    /// Copy with every blank value replaced by [`COORDINATE_SENTINEL`].
    pub fn normalized(&self) -> Self {
        Self {
            station1: self.station1.normalized(),
            station2: self.station2.normalized(),
        }
    }
}

fn normalize_coordinate(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        COORDINATE_SENTINEL.to_string()
    } else {
        value.to_string()
    }
}

/// Everything a session needs, fixed at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    port: String,
    file_name: String,
    duration_secs: u32,
    coordinates: Coordinates,
    output_dir: PathBuf,
}

impl SessionConfig {
    /// Start building a config for `port` writing to `<file_name>.txt`
    pub fn builder(port: impl Into<String>, file_name: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(port, file_name)
    }

    /// Reject configs a session cannot start with.
    ///
    /// Checked by the recorder before touching the device or the disk.
    pub fn validate(&self) -> AppResult<()> {
        if self.file_name.is_empty() {
            return Err(LoggerError::InvalidConfig(
                "log file name not filled in".to_string(),
            ));
        }
        if self.port.is_empty() {
            return Err(LoggerError::InvalidConfig("serial port not selected".to_string()));
        }
        if self.duration_secs == 0 {
            return Err(LoggerError::InvalidConfig(
                "sampling duration must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Port identifier (first token of what the operator picked)
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Base name of the log, without extension
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Sampling duration in whole seconds
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Sampling duration
    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }

    /// Station coordinates as entered
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// Directory receiving the log
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Full path of the log file
    pub fn log_path(&self) -> PathBuf {
        log_path(&self.output_dir, &self.file_name)
    }
}

/// Builder for [`SessionConfig`].
///
/// # Example
/// ```
/// use rssi_logger::session::SessionConfig;
///
/// let config = SessionConfig::builder("COM3 - USB Serial", "site_a")
///     .duration_secs(30)
///     .station1("-22.412345", "-45.449876")
///     .build();
/// assert_eq!(config.port(), "COM3");
/// assert_eq!(config.log_path().file_name().unwrap(), "site_a.txt");
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    inner: SessionConfig,
}

impl SessionConfigBuilder {
    /// Create a builder with a 20 s duration, blank coordinates and the working directory
    pub fn new(port: impl Into<String>, file_name: impl Into<String>) -> Self {
        let port: String = port.into();
        let file_name: String = file_name.into();
        Self {
            inner: SessionConfig {
                // Port pickers show "COM3 - description"; only the first token names the port.
                port: port.split_whitespace().next().unwrap_or_default().to_string(),
                file_name: file_name.trim().to_string(),
                duration_secs: 20,
                coordinates: Coordinates::default(),
                output_dir: PathBuf::from("."),
            },
        }
    }

    /// Set the sampling duration in seconds
    pub fn duration_secs(mut self, secs: u32) -> Self {
        self.inner.duration_secs = secs;
        self
    }

    /// Set transceiver 1 coordinates
    pub fn station1(mut self, latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        self.inner.coordinates.station1 = StationCoordinates::new(latitude, longitude);
        self
    }

    /// Set transceiver 2 coordinates
    pub fn station2(mut self, latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        self.inner.coordinates.station2 = StationCoordinates::new(latitude, longitude);
        self
    }

    /// Set both stations at once
    pub fn coordinates(mut self, coordinates: Coordinates) -> Self {
        self.inner.coordinates = coordinates;
        self
    }

    /// Set the directory receiving the log
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.inner.output_dir = dir.into();
        self
    }

    /// Finish building. Validation happens when the session opens.
    pub fn build(self) -> SessionConfig {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_is_first_token_of_picker_entry() {
        let config = SessionConfig::builder("/dev/ttyUSB0 - CP2102 USB to UART", "run").build();
        assert_eq!(config.port(), "/dev/ttyUSB0");
    }

    #[test]
    fn empty_name_or_port_is_invalid() {
        let no_name = SessionConfig::builder("COM3", "  ").build();
        assert!(matches!(no_name.validate(), Err(LoggerError::InvalidConfig(_))));

        let no_port = SessionConfig::builder("", "run").build();
        assert!(matches!(no_port.validate(), Err(LoggerError::InvalidConfig(_))));

        let no_time = SessionConfig::builder("COM3", "run").duration_secs(0).build();
        assert!(matches!(no_time.validate(), Err(LoggerError::InvalidConfig(_))));

        let ok = SessionConfig::builder("COM3", "run").build();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn blank_coordinates_normalize_to_sentinel() {
        let coordinates = Coordinates {
            station1: StationCoordinates::new("", " "),
            station2: StationCoordinates::new("-22.5", ""),
        }
        .normalized();

        assert_eq!(coordinates.station1.latitude, COORDINATE_SENTINEL);
        assert_eq!(coordinates.station1.longitude, COORDINATE_SENTINEL);
        assert_eq!(coordinates.station2.latitude, "-22.5");
        assert_eq!(coordinates.station2.longitude, COORDINATE_SENTINEL);
    }

    #[test]
    fn log_path_appends_extension() {
        let config = SessionConfig::builder("COM3", "site_b")
            .output_dir("/data/logs")
            .duration_secs(45)
            .build();
        assert_eq!(config.log_path(), PathBuf::from("/data/logs/site_b.txt"));
        assert_eq!(config.duration(), Duration::from_secs(45));
    }
}
