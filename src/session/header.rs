//! Log header block.
//!
//! Every log starts with:
//!
//! ```text
//! LOG_INFO
//! LAT_LORA1: -22.412345
//! LONG_LORA1: -45.449876
//! LAT_LORA2: -00.000000
//! LONG_LORA2: -00.000000
//! START_OF_LOG: 2024-05-02 14:03:11
//! LOG_SAMPLING_TIME: 20
//!
//! ```
//!
//! Keys and values are split on the first colon, so the statistics pass can read the block
//! back with [`LogHeader::parse`].

use super::config::Coordinates;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};

/// First line of every header
pub const HEADER_MARKER: &str = "LOG_INFO";

/// Format of the `START_OF_LOG` value
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header keys, in the order they are written
pub mod keys {
    /// Transceiver 1 latitude
    pub const LAT_LORA1: &str = "LAT_LORA1";
    /// Transceiver 1 longitude
    pub const LONG_LORA1: &str = "LONG_LORA1";
    /// Transceiver 2 latitude
    pub const LAT_LORA2: &str = "LAT_LORA2";
    /// Transceiver 2 longitude
    pub const LONG_LORA2: &str = "LONG_LORA2";
    /// Local start time of the session
    pub const START_OF_LOG: &str = "START_OF_LOG";
    /// Configured sampling duration in seconds
    pub const LOG_SAMPLING_TIME: &str = "LOG_SAMPLING_TIME";
}

/// Write the header block. Blank coordinates are recorded as the sentinel value.
pub fn write_header<W, Tz>(
    out: &mut W,
    coordinates: &Coordinates,
    started_at: &DateTime<Tz>,
    duration_secs: u32,
) -> io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let coordinates = coordinates.normalized();

    writeln!(out, "{}", HEADER_MARKER)?;
    writeln!(out, "{}: {}", keys::LAT_LORA1, coordinates.station1.latitude)?;
    writeln!(out, "{}: {}", keys::LONG_LORA1, coordinates.station1.longitude)?;
    writeln!(out, "{}: {}", keys::LAT_LORA2, coordinates.station2.latitude)?;
    writeln!(out, "{}: {}", keys::LONG_LORA2, coordinates.station2.longitude)?;
    writeln!(
        out,
        "{}: {}",
        keys::START_OF_LOG,
        started_at.format(TIMESTAMP_FORMAT)
    )?;
    writeln!(out, "{}: {}", keys::LOG_SAMPLING_TIME, duration_secs)?;
    writeln!(out)?;
    Ok(())
}

/// Header fields recovered from a log. Absent keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogHeader {
    /// `LAT_LORA1`
    pub lat_lora1: Option<String>,
    /// `LONG_LORA1`
    pub long_lora1: Option<String>,
    /// `LAT_LORA2`
    pub lat_lora2: Option<String>,
    /// `LONG_LORA2`
    pub long_lora2: Option<String>,
    /// `START_OF_LOG`
    pub start_of_log: Option<String>,
    /// `LOG_SAMPLING_TIME`
    pub log_sampling_time: Option<String>,
}

impl LogHeader {
    /// Parse the first non-blank block of `text`.
    ///
    /// Each line containing a colon is split on the first one, both halves trimmed. Unknown
    /// keys and lines without a colon are ignored. Parsing stops at the blank line closing
    /// the block, so body lines never override header values.
    ///
    /// A log that received several sessions holds several blocks; only the first (oldest)
    /// one is read.
    pub fn parse(text: &str) -> Self {
        let mut header = LogHeader::default();
        let mut in_block = false;

        for line in text.lines() {
            if line.trim().is_empty() {
                if in_block {
                    break;
                }
                continue;
            }
            in_block = true;

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = Some(value.trim().to_string());
            match key.trim() {
                keys::LAT_LORA1 => header.lat_lora1 = value,
                keys::LONG_LORA1 => header.long_lora1 = value,
                keys::LAT_LORA2 => header.lat_lora2 = value,
                keys::LONG_LORA2 => header.long_lora2 = value,
                keys::START_OF_LOG => header.start_of_log = value,
                keys::LOG_SAMPLING_TIME => header.log_sampling_time = value,
                _ => {}
            }
        }

        header
    }

    /// Whether all six fields were found
    pub fn is_complete(&self) -> bool {
        self.lat_lora1.is_some()
            && self.long_lora1.is_some()
            && self.lat_lora2.is_some()
            && self.long_lora2.is_some()
            && self.start_of_log.is_some()
            && self.log_sampling_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::config::{StationCoordinates, COORDINATE_SENTINEL};
    use chrono::{FixedOffset, TimeZone};

    fn started_at() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 2, 14, 3, 11)
            .unwrap()
    }

    #[test]
    fn header_layout_is_fixed() {
        let coordinates = Coordinates {
            station1: StationCoordinates::new("-22.412345", "-45.449876"),
            station2: StationCoordinates::new("-22.413000", "-45.450100"),
        };
        let mut out = Vec::new();
        write_header(&mut out, &coordinates, &started_at(), 20).unwrap();

        let expected = "LOG_INFO\n\
                        LAT_LORA1: -22.412345\n\
                        LONG_LORA1: -45.449876\n\
                        LAT_LORA2: -22.413000\n\
                        LONG_LORA2: -45.450100\n\
                        START_OF_LOG: 2024-05-02 14:03:11\n\
                        LOG_SAMPLING_TIME: 20\n\
                        \n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn blank_coordinates_written_as_sentinel() {
        let mut out = Vec::new();
        write_header(&mut out, &Coordinates::default(), &started_at(), 10).unwrap();
        let text = String::from_utf8(out).unwrap();

        let header = LogHeader::parse(&text);
        for value in [
            &header.lat_lora1,
            &header.long_lora1,
            &header.lat_lora2,
            &header.long_lora2,
        ] {
            assert_eq!(value.as_deref(), Some(COORDINATE_SENTINEL));
        }
        assert!(!text.contains(": \n"));
    }

    #[test]
    fn parse_round_trips_written_header() {
        let mut out = Vec::new();
        write_header(&mut out, &Coordinates::default(), &started_at(), 35).unwrap();
        out.extend_from_slice(b"Mensagem recebida: Hello im random sender. RSSI: -42\n");

        let header = LogHeader::parse(&String::from_utf8(out).unwrap());
        assert!(header.is_complete());
        // Value keeps its own colons: split happens on the first one only
        assert_eq!(header.start_of_log.as_deref(), Some("2024-05-02 14:03:11"));
        assert_eq!(header.log_sampling_time.as_deref(), Some("35"));
    }

    #[test]
    fn oldest_block_wins_in_appended_log() {
        let mut text = Vec::new();
        write_header(&mut text, &Coordinates::default(), &started_at(), 20).unwrap();
        text.extend_from_slice(b"Mensagem recebida: Hello im random sender. RSSI: -50\n");
        write_header(&mut text, &Coordinates::default(), &started_at(), 45).unwrap();

        let header = LogHeader::parse(&String::from_utf8(text).unwrap());
        assert_eq!(header.log_sampling_time.as_deref(), Some("20"));
    }

    #[test]
    fn missing_keys_stay_absent() {
        let header = LogHeader::parse("LOG_INFO\nLAT_LORA1: 1.0\n\nLONG_LORA1: 2.0\n");
        assert_eq!(header.lat_lora1.as_deref(), Some("1.0"));
        assert_eq!(header.long_lora1, None);
        assert!(!header.is_complete());
    }
}
