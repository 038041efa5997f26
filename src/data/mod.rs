//! Data ingestion
//!
//! Loads the historical match spreadsheet (CSV export) and cleans it into
//! labeled match records.

pub mod dataset;

pub use dataset::{MatchDataset, RawMatchRow};
