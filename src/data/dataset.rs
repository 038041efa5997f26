//! Match dataset loading and cleaning
//!
//! Reads the CSV export of the match spreadsheet, checks the schema, fills
//! missing values and drops rows that cannot be used (no winner, or a missing
//! pre-match factor).

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::{CricketError, MatchRecord, Result, UNKNOWN_CITY};

/// Columns the training pipeline cannot run without
pub const TRAINING_COLUMNS: [&str; 6] = [
    "team1",
    "team2",
    "toss_winner",
    "toss_decision",
    "city",
    "match_winner",
];

/// Columns the descriptive insights additionally need
pub const INSIGHT_COLUMNS: [&str; 8] = [
    "team1",
    "team2",
    "toss_winner",
    "toss_decision",
    "city",
    "match_winner",
    "venue",
    "season_id",
];

/// One row as it appears in the file; every field may be missing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMatchRow {
    #[serde(default)]
    pub team1: Option<String>,
    #[serde(default)]
    pub team2: Option<String>,
    #[serde(default)]
    pub toss_winner: Option<String>,
    #[serde(default)]
    pub toss_decision: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub match_winner: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub season_id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub win_by_runs: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub win_by_wickets: Option<f64>,
}

/// Trimmed, non-empty value or None
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Season ids come out of spreadsheets as either "2017" or "2017.0"
fn parse_season(value: Option<String>) -> Option<u32> {
    let text = present(value)?;
    if let Ok(season) = text.parse::<u32>() {
        return Some(season);
    }
    match text.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 => Some(v as u32),
        _ => {
            log::debug!("Ignoring unparseable season_id '{}'", text);
            None
        }
    }
}

impl RawMatchRow {
    /// Fill missing values and convert to a labeled record.
    ///
    /// Returns None for rows without a winner or without one of the
    /// team/toss fields; those rows are unusable for both training and
    /// statistics.
    pub fn clean(self) -> Option<MatchRecord> {
        let winner = present(self.match_winner)?;
        let team1 = present(self.team1)?;
        let team2 = present(self.team2)?;
        let toss_winner = present(self.toss_winner)?;
        let toss_decision = present(self.toss_decision)?;

        Some(MatchRecord {
            team1,
            team2,
            toss_winner,
            toss_decision,
            city: present(self.city).unwrap_or_else(|| UNKNOWN_CITY.to_string()),
            venue: present(self.venue).unwrap_or_default(),
            season_id: parse_season(self.season_id),
            win_by_runs: self.win_by_runs.unwrap_or(0.0),
            win_by_wickets: self.win_by_wickets.unwrap_or(0.0),
            winner,
        })
    }
}

/// Fail fast when a required column is absent from the header row
pub fn check_schema(headers: &csv::StringRecord, required: &[&str]) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(CricketError::MissingColumn(column.to_string()));
        }
    }
    Ok(())
}

/// Cleaned, labeled historical matches
#[derive(Debug, Clone, Default)]
pub struct MatchDataset {
    records: Vec<MatchRecord>,
    /// Raw rows read (after any sample-size truncation)
    raw_rows: usize,
}

impl MatchDataset {
    /// Load the rows the training pipeline uses
    pub fn for_training<P: AsRef<Path>>(path: P, sample_size: Option<usize>) -> Result<Self> {
        Self::from_path(path, &TRAINING_COLUMNS, sample_size)
    }

    /// Load the full file for the descriptive insights
    pub fn for_insights<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path(path, &INSIGHT_COLUMNS, None)
    }

    /// Load a CSV file, checking `required` columns and keeping at most
    /// `limit` raw rows
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        required: &[&str],
        limit: Option<usize>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            CricketError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open dataset {}: {}", path.display(), e),
            ))
        })?;
        let dataset = Self::from_reader(file, required, limit)?;
        log::info!(
            "Loaded {} labeled matches from {} ({} raw rows)",
            dataset.len(),
            path.display(),
            dataset.raw_rows
        );
        Ok(dataset)
    }

    /// Load from any CSV reader
    pub fn from_reader<R: Read>(reader: R, required: &[&str], limit: Option<usize>) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);

        check_schema(csv_reader.headers()?, required)?;

        let mut rows = Vec::new();
        for (i, row) in csv_reader.deserialize::<RawMatchRow>().enumerate() {
            if limit.is_some_and(|n| i >= n) {
                break;
            }
            rows.push(row?);
        }

        Ok(Self::from_rows(rows))
    }

    /// Clean raw rows, dropping unusable ones
    pub fn from_rows(rows: Vec<RawMatchRow>) -> Self {
        let raw_rows = rows.len();
        let records: Vec<MatchRecord> = rows.into_iter().filter_map(RawMatchRow::clean).collect();

        let dropped = raw_rows - records.len();
        if dropped > 0 {
            log::warn!(
                "Dropped {} of {} rows with no winner or missing team/toss fields",
                dropped,
                raw_rows
            );
        }

        MatchDataset { records, raw_rows }
    }

    /// Create dataset directly from cleaned records
    pub fn from_records(records: Vec<MatchRecord>) -> Self {
        let raw_rows = records.len();
        MatchDataset { records, raw_rows }
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Get the number of labeled matches
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of raw rows that did not survive cleaning
    pub fn dropped(&self) -> usize {
        self.raw_rows - self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "id,season_id,city,team1,team2,toss_winner,toss_decision,match_winner,win_by_runs,win_by_wickets,venue";

    fn load(body: &str, limit: Option<usize>) -> Result<MatchDataset> {
        let text = format!("{}\n{}", HEADER, body);
        MatchDataset::from_reader(text.as_bytes(), &INSIGHT_COLUMNS, limit)
    }

    #[test]
    fn test_missing_values_are_filled() {
        let dataset = load("1,2017,,MI,CSK,MI,bat,MI,,,Wankhede Stadium", None).unwrap();
        let record = &dataset.records()[0];

        assert_eq!(record.city, "Unknown");
        assert_eq!(record.win_by_runs, 0.0);
        assert_eq!(record.win_by_wickets, 0.0);
        assert_eq!(record.season_id, Some(2017));
    }

    #[test]
    fn test_unlabeled_rows_are_dropped() {
        let body = "1,2017,Mumbai,MI,CSK,MI,bat,MI,10,0,Wankhede\n\
                    2,2017,Chennai,CSK,MI,CSK,field,,0,0,Chepauk\n\
                    3,2017,Pune,MI,,MI,bat,MI,0,4,MCA";
        let dataset = load(body, None).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.dropped(), 2);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let text = "team1,team2,toss_winner,toss_decision,match_winner\nMI,CSK,MI,bat,MI";
        let err = MatchDataset::from_reader(text.as_bytes(), &TRAINING_COLUMNS, None).unwrap_err();
        assert!(matches!(err, CricketError::MissingColumn(ref c) if c == "city"));
    }

    #[test]
    fn test_training_schema_does_not_need_venue() {
        let text = "team1,team2,toss_winner,toss_decision,city,match_winner\nMI,CSK,MI,bat,Mumbai,MI";
        let dataset = MatchDataset::from_reader(text.as_bytes(), &TRAINING_COLUMNS, None).unwrap();
        assert_eq!(dataset.records()[0].venue, "");
        assert_eq!(dataset.records()[0].season_id, None);
    }

    #[test]
    fn test_sample_size_truncates_raw_rows() {
        let body = "1,2017,Mumbai,MI,CSK,MI,bat,MI,10,0,Wankhede\n\
                    2,2017,Chennai,CSK,MI,CSK,field,,0,0,Chepauk\n\
                    3,2018,Pune,MI,RPS,MI,bat,RPS,0,4,MCA";
        let dataset = load(body, Some(2)).unwrap();

        // Truncation happens before cleaning: row 3 is never seen
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.dropped(), 1);
    }

    #[test]
    fn test_float_season_and_margins() {
        let dataset = load("1,2011.0,Delhi,DD,KKR,KKR,field,KKR,0.0,7.0,Feroz Shah Kotla", None).unwrap();
        let record = &dataset.records()[0];
        assert_eq!(record.season_id, Some(2011));
        assert_eq!(record.win_by_wickets, 7.0);
    }
}
