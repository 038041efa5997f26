//! Home/away classification
//!
//! A match counts as a home game for team1 when its city name appears in the
//! venue name. Venue names do not always carry the city, so this is a
//! heuristic and nothing more.

use std::collections::HashMap;

use crate::MatchRecord;

/// Label used for matches that are not home games for team1
pub const AWAY_LABEL: &str = "Away";

/// Home/away label of a match: team1's name or [`AWAY_LABEL`]
pub fn home_away_label(record: &MatchRecord) -> &str {
    if record.venue.contains(record.city.as_str()) {
        &record.team1
    } else {
        AWAY_LABEL
    }
}

/// Counts matches per home/away label
#[derive(Debug, Clone, Default)]
pub struct VenueTracker {
    counts: HashMap<String, usize>,
}

impl VenueTracker {
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

    pub fn update(&mut self, record: &MatchRecord) {
        *self
            .counts
            .entry(home_away_label(record).to_string())
            .or_insert(0) += 1;
    }

    /// Label counts, largest first, ties by label
    pub fn counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> =
            self.counts.iter().map(|(l, &n)| (l.clone(), n)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    fn at(city: &str, venue: &str, team1: &str) -> MatchRecord {
        let mut r = record(team1, "Other", team1, "bat", city, team1);
        r.venue = venue.to_string();
        r
    }

    #[test]
    fn test_city_in_venue_is_home() {
        let r = at("Mumbai", "Wankhede Stadium, Mumbai", "MI");
        assert_eq!(home_away_label(&r), "MI");
    }

    #[test]
    fn test_city_missing_from_venue_is_away() {
        let r = at("Bangalore", "M Chinnaswamy Stadium", "RCB");
        assert_eq!(home_away_label(&r), AWAY_LABEL);

        // Matching is case-sensitive
        let r = at("mumbai", "Wankhede Stadium, Mumbai", "MI");
        assert_eq!(home_away_label(&r), AWAY_LABEL);
    }

    #[test]
    fn test_missing_venue_is_away() {
        let r = at("Pune", "", "RPS");
        assert_eq!(home_away_label(&r), AWAY_LABEL);
    }

    #[test]
    fn test_counts_sorted() {
        let tracker = VenueTracker::from_records(&[
            at("Mumbai", "Wankhede Stadium, Mumbai", "MI"),
            at("Delhi", "Feroz Shah Kotla", "DD"),
            at("Chennai", "MA Chidambaram Stadium, Chennai", "CSK"),
            at("Kolkata", "Eden Gardens", "KKR"),
        ]);
        assert_eq!(
            tracker.counts(),
            vec![
                ("Away".to_string(), 2),
                ("CSK".to_string(), 1),
                ("MI".to_string(), 1)
            ]
        );
    }
}
