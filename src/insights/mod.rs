//! Descriptive match insights
//!
//! The six chart datasets computed from the cleaned historical matches:
//! team wins, toss decisions, home/away split, win percentage, matches per
//! season and wins per season.

pub mod team_stats;
pub mod venue;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::{MatchRecord, Result};

pub use team_stats::{TeamStatistics, TeamStatsTracker, WinPercentage};
pub use venue::{home_away_label, VenueTracker, AWAY_LABEL};

/// One of the six charts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart {
    TeamWins,
    TossDecisions,
    HomeAway,
    WinPercentage,
    SeasonMatches,
    SeasonWins,
}

impl Chart {
    pub const ALL: [Chart; 6] = [
        Chart::TeamWins,
        Chart::TossDecisions,
        Chart::HomeAway,
        Chart::WinPercentage,
        Chart::SeasonMatches,
        Chart::SeasonWins,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Chart::TeamWins => "team-wins",
            Chart::TossDecisions => "toss-decisions",
            Chart::HomeAway => "home-away",
            Chart::WinPercentage => "win-percentage",
            Chart::SeasonMatches => "season-matches",
            Chart::SeasonWins => "season-wins",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Chart::TeamWins => "Team-wise wins",
            Chart::TossDecisions => "Toss decision impact",
            Chart::HomeAway => "Home vs away (venue heuristic)",
            Chart::WinPercentage => "Win percentage by team",
            Chart::SeasonMatches => "Matches per season",
            Chart::SeasonWins => "Wins per season",
        }
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Chart {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Chart::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Chart::ALL.iter().map(|c| c.name()).collect();
                format!("Unknown chart: {}. Use one of: {}", s, names.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonMatches {
    pub season_id: u32,
    pub matches: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonWins {
    pub season_id: u32,
    pub winner: String,
    pub wins: usize,
}

/// Header plus stringified rows of one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartTable {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// All chart data for a dataset
#[derive(Debug, Clone, Default, Serialize)]
pub struct Insights {
    pub team_wins: Vec<LabelCount>,
    pub toss_decisions: Vec<LabelCount>,
    pub home_away: Vec<LabelCount>,
    pub win_percentages: Vec<WinPercentage>,
    pub season_matches: Vec<SeasonMatches>,
    pub season_wins: Vec<SeasonWins>,
}

fn label_counts(pairs: Vec<(String, usize)>) -> Vec<LabelCount> {
    pairs
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect()
}

impl Insights {
    /// Compute every chart from cleaned, labeled records
    pub fn compute(records: &[MatchRecord]) -> Self {
        let teams = TeamStatsTracker::from_records(records);
        let venues = VenueTracker::from_records(records);

        let mut decisions: BTreeMap<&str, usize> = BTreeMap::new();
        let mut per_season: BTreeMap<u32, usize> = BTreeMap::new();
        let mut season_winners: BTreeMap<(u32, &str), usize> = BTreeMap::new();
        let mut no_season = 0;

        for record in records {
            *decisions.entry(record.toss_decision.as_str()).or_insert(0) += 1;
            match record.season_id {
                Some(season) => {
                    *per_season.entry(season).or_insert(0) += 1;
                    *season_winners
                        .entry((season, record.winner.as_str()))
                        .or_insert(0) += 1;
                }
                None => no_season += 1,
            }
        }
        if no_season > 0 {
            log::warn!("{} matches have no season_id; left out of season charts", no_season);
        }

        Insights {
            team_wins: label_counts(teams.win_counts()),
            toss_decisions: decisions
                .into_iter()
                .map(|(label, count)| LabelCount {
                    label: label.to_string(),
                    count,
                })
                .collect(),
            home_away: label_counts(venues.counts()),
            win_percentages: teams.win_percentages(),
            season_matches: per_season
                .into_iter()
                .map(|(season_id, matches)| SeasonMatches { season_id, matches })
                .collect(),
            season_wins: season_winners
                .into_iter()
                .map(|((season_id, winner), wins)| SeasonWins {
                    season_id,
                    winner: winner.to_string(),
                    wins,
                })
                .collect(),
        }
    }

    /// Rows of one chart for table or CSV output
    pub fn table(&self, chart: Chart) -> ChartTable {
        let (headers, rows): (Vec<&'static str>, Vec<Vec<String>>) = match chart {
            Chart::TeamWins => (
                vec!["team", "wins"],
                count_rows(&self.team_wins),
            ),
            Chart::TossDecisions => (
                vec!["toss_decision", "matches"],
                count_rows(&self.toss_decisions),
            ),
            Chart::HomeAway => (
                vec!["home_team", "matches"],
                count_rows(&self.home_away),
            ),
            Chart::WinPercentage => (
                vec!["team", "appearances", "wins", "win_pct"],
                self.win_percentages
                    .iter()
                    .map(|w| {
                        vec![
                            w.team.clone(),
                            w.appearances.to_string(),
                            w.wins.to_string(),
                            format!("{:.2}", w.win_pct),
                        ]
                    })
                    .collect(),
            ),
            Chart::SeasonMatches => (
                vec!["season_id", "matches"],
                self.season_matches
                    .iter()
                    .map(|s| vec![s.season_id.to_string(), s.matches.to_string()])
                    .collect(),
            ),
            Chart::SeasonWins => (
                vec!["season_id", "winner", "wins"],
                self.season_wins
                    .iter()
                    .map(|s| vec![s.season_id.to_string(), s.winner.clone(), s.wins.to_string()])
                    .collect(),
            ),
        };
        ChartTable { headers, rows }
    }

    /// JSON value of one chart
    pub fn chart_json(&self, chart: Chart) -> Result<serde_json::Value> {
        let value = match chart {
            Chart::TeamWins => serde_json::to_value(&self.team_wins)?,
            Chart::TossDecisions => serde_json::to_value(&self.toss_decisions)?,
            Chart::HomeAway => serde_json::to_value(&self.home_away)?,
            Chart::WinPercentage => serde_json::to_value(&self.win_percentages)?,
            Chart::SeasonMatches => serde_json::to_value(&self.season_matches)?,
            Chart::SeasonWins => serde_json::to_value(&self.season_wins)?,
        };
        Ok(value)
    }
}

fn count_rows(counts: &[LabelCount]) -> Vec<Vec<String>> {
    counts
        .iter()
        .map(|c| vec![c.label.clone(), c.count.to_string()])
        .collect()
}
