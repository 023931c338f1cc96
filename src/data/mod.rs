//! Persistent outputs shared across sessions.

pub mod summary_table;

pub use summary_table::{SummaryRow, SummaryTable, SUMMARY_COLUMNS};
