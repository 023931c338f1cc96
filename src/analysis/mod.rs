//! Offline statistics over completed logs.

pub mod extractor;
pub mod statistics;

pub use extractor::{
    extract_sample, scan_samples, ExtractionReport, MalformedSample, StatisticsExtractor, MARKERS,
    RECEIVED_MARKER, SENT_MARKER,
};
pub use statistics::{format_rounded, Statistics};
