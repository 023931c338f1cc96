//! Statistics pass over a completed log.

use super::statistics::Statistics;
use crate::config::AppConfig;
use crate::data::{SummaryRow, SummaryTable};
use crate::error::{AppResult, LoggerError};
use crate::session::{log_path, LogHeader};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Prefix of a report received from the remote transceiver
pub const RECEIVED_MARKER: &str = "Mensagem recebida: Hello im random sender. RSSI: ";

/// Prefix of a report about a message sent by the local transceiver
pub const SENT_MARKER: &str = "Mensagem enviada: Hello im random sender. RSSI: ";

/// Markers identifying lines that carry an RSSI reading
pub const MARKERS: [&str; 2] = [RECEIVED_MARKER, SENT_MARKER];

/// A marker line whose reading is not an integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedSample {
    /// 1-based line number in the log
    pub line_number: usize,
    /// The offending line
    pub text: String,
}

/// Reading carried by `line`, if it contains a marker.
///
/// `None` means the line carries no reading at all; `Some(Err(_))` means it has a marker
/// but the trailing text is not an integer.
pub fn extract_sample(line: &str) -> Option<Result<i64, ParseIntError>> {
    MARKERS.iter().find_map(|marker| {
        line.split_once(marker)
            .map(|(_, rest)| rest.trim().parse::<i64>())
    })
}

/// Samples of every marker line in `text`, plus the lines that could not be read.
pub fn scan_samples(text: &str) -> (Vec<i64>, Vec<MalformedSample>) {
    let mut samples = Vec::new();
    let mut malformed = Vec::new();

    for (index, line) in text.lines().enumerate() {
        match extract_sample(line) {
            Some(Ok(rssi)) => samples.push(rssi),
            Some(Err(e)) => {
                warn!(line = index + 1, text = %line, "Invalid RSSI value found in line: {}", e);
                malformed.push(MalformedSample {
                    line_number: index + 1,
                    text: line.to_string(),
                });
            }
            None => {}
        }
    }

    (samples, malformed)
}

/// Outcome of one statistics pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    /// Log that was analysed
    pub path: PathBuf,
    /// Aggregate of the samples found
    pub stats: Statistics,
    /// `"Mean: ..."` display string
    pub mean_display: String,
    /// `"Std: ..."` display string
    pub stdev_display: String,
    /// Marker lines that were skipped
    pub malformed: Vec<MalformedSample>,
    /// Row appended to the summary table
    pub row: SummaryRow,
}

/// Reads logs from a directory and records their statistics in a summary table.
#[derive(Debug, Clone)]
pub struct StatisticsExtractor {
    log_dir: PathBuf,
    table: SummaryTable,
}

impl StatisticsExtractor {
    /// Analyse logs in `log_dir`, appending to `table`
    pub fn new(log_dir: impl Into<PathBuf>, table: SummaryTable) -> Self {
        Self {
            log_dir: log_dir.into(),
            table,
        }
    }

    /// Logs from `storage.output_dir`, table at [`AppConfig::stats_path`]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.storage.output_dir.clone(),
            SummaryTable::new(config.stats_path()),
        )
    }

    /// Directory holding the logs
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// The summary table rows are appended to
    pub fn table(&self) -> &SummaryTable {
        &self.table
    }

    /// Analyse `<file_name>.txt` and append its summary row.
    ///
    /// Fails with [`LoggerError::LogNotFound`] without touching the table when the log does
    /// not exist. Unreadable samples are skipped and listed in the report.
    pub fn extract(&self, file_name: &str) -> AppResult<ExtractionReport> {
        let name = file_name.trim();
        if name.is_empty() {
            return Err(LoggerError::InvalidConfig(
                "log file name not filled in".to_string(),
            ));
        }

        let path = log_path(&self.log_dir, name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "Log file does not exist");
                return Err(LoggerError::LogNotFound(path));
            }
            Err(e) => return Err(e.into()),
        };
        let text = String::from_utf8_lossy(&bytes);

        let (samples, malformed) = scan_samples(&text);
        let stats = Statistics::from_samples(&samples);
        let header = LogHeader::parse(&text);
        if !header.is_complete() {
            warn!(path = %path.display(), "Log header incomplete, summary row will have blanks");
        }

        let row = SummaryRow::new(name, &stats, &header);
        self.table.append(&row)?;

        info!(
            id = name,
            count = stats.count,
            mean = stats.mean,
            stdev = stats.stdev,
            skipped = malformed.len(),
            "Statistics saved"
        );

        Ok(ExtractionReport {
            path,
            mean_display: stats.mean_display(),
            stdev_display: stats.stdev_display(),
            stats,
            malformed,
            row,
        })
    }
}
