//! Team statistics computation
//!
//! Appearance and win tallies per team over historical matches.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::MatchRecord;

/// Tally for one team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamStatistics {
    /// Matches played as team1 or team2
    pub appearances: usize,
    /// Wins in matches the team played
    pub wins: usize,
}

impl TeamStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update statistics with a match the team played in
    pub fn update(&mut self, record: &MatchRecord, team: &str) {
        if let Some(won) = record.did_win(team) {
            self.appearances += 1;
            if won {
                self.wins += 1;
            }
        }
    }

    /// Win percentage (0-100); None without appearances
    pub fn win_pct(&self) -> Option<f64> {
        if self.appearances == 0 {
            None
        } else {
            Some(round2(self.wins as f64 * 100.0 / self.appearances as f64))
        }
    }
}

/// Round to two decimals
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Win percentage row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinPercentage {
    pub team: String,
    pub appearances: usize,
    pub wins: usize,
    pub win_pct: f64,
}

/// Per-team tallies plus the raw winner column count
#[derive(Debug, Clone, Default)]
pub struct TeamStatsTracker {
    stats: HashMap<String, TeamStatistics>,
    /// Occurrences of each `match_winner` value
    winner_counts: HashMap<String, usize>,
}

impl TeamStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[MatchRecord]) -> Self {
        let mut tracker = Self::new();
        for record in records {
            tracker.update(record);
        }
        tracker
    }

    /// Update with a match result
    pub fn update(&mut self, record: &MatchRecord) {
        self.stats
            .entry(record.team1.clone())
            .or_default()
            .update(record, &record.team1);
        if record.team2 != record.team1 {
            self.stats
                .entry(record.team2.clone())
                .or_default()
                .update(record, &record.team2);
        }
        *self.winner_counts.entry(record.winner.clone()).or_insert(0) += 1;
    }

    /// Team-wise win counts, most wins first, ties by name
    pub fn win_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .winner_counts
            .iter()
            .map(|(team, &n)| (team.clone(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Win percentage per team with at least one appearance, sorted by team
    pub fn win_percentages(&self) -> Vec<WinPercentage> {
        let sorted: BTreeMap<&String, &TeamStatistics> = self.stats.iter().collect();
        sorted
            .into_iter()
            .filter_map(|(team, s)| {
                s.win_pct().map(|win_pct| WinPercentage {
                    team: team.clone(),
                    appearances: s.appearances,
                    wins: s.wins,
                    win_pct,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[test]
    fn test_team_statistics_update() {
        let mut stats = TeamStatistics::new();
        stats.update(&record("A", "B", "A", "bat", "X", "A"), "A");
        stats.update(&record("B", "A", "A", "bat", "X", "B"), "A");
        stats.update(&record("B", "C", "B", "bat", "X", "C"), "A");

        assert_eq!(stats.appearances, 2);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.win_pct(), Some(50.0));
        assert_eq!(TeamStatistics::new().win_pct(), None);
    }

    #[test]
    fn test_win_counts_sorted() {
        let tracker = TeamStatsTracker::from_records(&[
            record("A", "B", "A", "bat", "X", "B"),
            record("A", "C", "A", "bat", "X", "C"),
            record("B", "C", "B", "bat", "X", "B"),
            record("A", "B", "A", "bat", "X", "A"),
            record("C", "B", "C", "bat", "X", "C"),
        ]);
        assert_eq!(
            tracker.win_counts(),
            vec![("B".to_string(), 2), ("C".to_string(), 2), ("A".to_string(), 1)]
        );
    }

    #[test]
    fn test_win_percentages_rounded_and_bounded() {
        let tracker = TeamStatsTracker::from_records(&[
            record("A", "B", "A", "bat", "X", "A"),
            record("A", "C", "A", "bat", "X", "C"),
            record("C", "A", "C", "bat", "X", "C"),
            // Winner outside the matchup counts for nobody's percentage
            record("B", "C", "B", "bat", "X", "A"),
        ]);
        let pct = tracker.win_percentages();
        let teams: Vec<&str> = pct.iter().map(|p| p.team.as_str()).collect();
        assert_eq!(teams, vec!["A", "B", "C"]);

        assert_eq!(pct[0].appearances, 3);
        assert_eq!(pct[0].wins, 1);
        assert_eq!(pct[0].win_pct, 33.33);
        assert_eq!(pct[1].win_pct, 0.0);
        assert_eq!(pct[2].win_pct, 66.67);
        assert!(pct.iter().all(|p| (0.0..=100.0).contains(&p.win_pct)));
    }
}
