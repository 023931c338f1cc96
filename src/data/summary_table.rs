//! Cumulative CSV table of per-log statistics.
//!
//! One row is appended per analysis run. The header row is written only when the table is
//! created, and rows are never rewritten or deduplicated: analysing the same log twice
//! yields two rows.

use crate::analysis::Statistics;
use crate::error::AppResult;
use crate::session::LogHeader;
use serde::{Deserialize, Serialize, Serializer};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Column names, in order
pub const SUMMARY_COLUMNS: [&str; 9] = [
    "ID",
    "AVG",
    "STD",
    "LAT_L1",
    "LONG_L1",
    "LAT_L2",
    "LONG_L2",
    "START",
    "LOG_SAMPLING_TIME",
];

/// One analysed log. Missing header values are written as empty fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Log base name
    #[serde(rename = "ID")]
    pub id: String,
    /// Mean RSSI
    #[serde(rename = "AVG", serialize_with = "shortest_float")]
    pub mean: f64,
    /// Standard deviation of RSSI
    #[serde(rename = "STD", serialize_with = "shortest_float")]
    pub stdev: f64,
    /// Transceiver 1 latitude
    #[serde(rename = "LAT_L1")]
    pub lat1: Option<String>,
    /// Transceiver 1 longitude
    #[serde(rename = "LONG_L1")]
    pub long1: Option<String>,
    /// Transceiver 2 latitude
    #[serde(rename = "LAT_L2")]
    pub lat2: Option<String>,
    /// Transceiver 2 longitude
    #[serde(rename = "LONG_L2")]
    pub long2: Option<String>,
    /// Session start timestamp
    #[serde(rename = "START")]
    pub start: Option<String>,
    /// Configured sampling duration
    #[serde(rename = "LOG_SAMPLING_TIME")]
    pub sampling_time: Option<String>,
}

impl SummaryRow {
    /// Assemble a row from a log's statistics and header
    pub fn new(id: &str, stats: &Statistics, header: &LogHeader) -> Self {
        Self {
            id: id.to_string(),
            mean: stats.mean,
            stdev: stats.stdev,
            lat1: header.lat_lora1.clone(),
            long1: header.long_lora1.clone(),
            lat2: header.lat_lora2.clone(),
            long2: header.long_lora2.clone(),
            start: header.start_of_log.clone(),
            sampling_time: header.log_sampling_time.clone(),
        }
    }
}

// Whole numbers print without a fractional part (`-42`, not `-42.0`).
fn shortest_float<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Append-only summary table on disk.
#[derive(Debug, Clone)]
pub struct SummaryTable {
    path: PathBuf,
}

impl SummaryTable {
    /// Table stored at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the table
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `row`, writing the column header first if the table is new or empty.
    pub fn append(&self, row: &SummaryRow) -> AppResult<()> {
        let is_new = fs::metadata(&self.path)
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;

        debug!(path = %self.path.display(), id = %row.id, created = is_new, "Summary row appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(id: &str, mean: f64, stdev: f64) -> SummaryRow {
        let header = LogHeader::parse(
            "LOG_INFO\nLAT_LORA1: -22.1\nLONG_LORA1: -45.2\nLAT_LORA2: -22.3\n\
             LONG_LORA2: -45.4\nSTART_OF_LOG: 2024-05-02 14:03:11\nLOG_SAMPLING_TIME: 20\n\n",
        );
        SummaryRow::new(
            id,
            &Statistics {
                count: 2,
                mean,
                stdev,
            },
            &header,
        )
    }

    #[test]
    fn header_written_once() {
        let dir = tempdir().unwrap();
        let table = SummaryTable::new(dir.path().join("stats.csv"));

        table.append(&row("a", -42.0, 0.0)).unwrap();
        table.append(&row("b", -45.0, 7.0710678118654755)).unwrap();

        let text = fs::read_to_string(table.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], SUMMARY_COLUMNS.join(","));
        assert_eq!(
            lines[1],
            "a,-42,0,-22.1,-45.2,-22.3,-45.4,2024-05-02 14:03:11,20"
        );
        assert!(lines[2].starts_with("b,-45,7.0710678118654755,"));
    }

    #[test]
    fn missing_header_fields_are_blank() {
        let dir = tempdir().unwrap();
        let table = SummaryTable::new(dir.path().join("nested/stats.csv"));
        let stats = Statistics::from_samples(&[-60]);

        table
            .append(&SummaryRow::new("bare", &stats, &LogHeader::default()))
            .unwrap();

        let text = fs::read_to_string(table.path()).unwrap();
        assert_eq!(text.lines().nth(1), Some("bare,-60,0,,,,,,"));
    }

    #[test]
    fn rows_read_back_with_csv_reader() {
        let dir = tempdir().unwrap();
        let table = SummaryTable::new(dir.path().join("stats.csv"));
        let original = row("site_c", -51.5, 2.25);
        table.append(&original).unwrap();

        let mut reader = csv::Reader::from_path(table.path()).unwrap();
        let rows: Vec<SummaryRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows, vec![original]);
    }
}
