//! Match feature representation for classifier input
//!
//! The model sees five integer codes in a fixed column order. Training and
//! serving both go through [`FeatureColumn::ALL`], so the order cannot drift
//! between the two.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{MatchContext, MatchRecord};

/// The five pre-match factor columns, declared in feature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    Team1,
    Team2,
    TossWinner,
    TossDecision,
    City,
}

impl FeatureColumn {
    /// Feature order used to build every feature vector
    pub const ALL: [FeatureColumn; 5] = [
        FeatureColumn::Team1,
        FeatureColumn::Team2,
        FeatureColumn::TossWinner,
        FeatureColumn::TossDecision,
        FeatureColumn::City,
    ];

    /// Dataset column name
    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::Team1 => "team1",
            FeatureColumn::Team2 => "team2",
            FeatureColumn::TossWinner => "toss_winner",
            FeatureColumn::TossDecision => "toss_decision",
            FeatureColumn::City => "city",
        }
    }

    /// Position in the feature vector
    pub fn index(&self) -> usize {
        match self {
            FeatureColumn::Team1 => 0,
            FeatureColumn::Team2 => 1,
            FeatureColumn::TossWinner => 2,
            FeatureColumn::TossDecision => 3,
            FeatureColumn::City => 4,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "team1" => Some(FeatureColumn::Team1),
            "team2" => Some(FeatureColumn::Team2),
            "toss_winner" => Some(FeatureColumn::TossWinner),
            "toss_decision" => Some(FeatureColumn::TossDecision),
            "city" => Some(FeatureColumn::City),
            _ => None,
        }
    }

    /// This column's value in a match context
    pub fn value_of<'a>(&self, context: &'a MatchContext) -> &'a str {
        match self {
            FeatureColumn::Team1 => &context.team1,
            FeatureColumn::Team2 => &context.team2,
            FeatureColumn::TossWinner => &context.toss_winner,
            FeatureColumn::TossDecision => &context.toss_decision,
            FeatureColumn::City => &context.city,
        }
    }

    /// This column's value in a historical record
    pub fn value_of_record<'a>(&self, record: &'a MatchRecord) -> &'a str {
        match self {
            FeatureColumn::Team1 => &record.team1,
            FeatureColumn::Team2 => &record.team2,
            FeatureColumn::TossWinner => &record.toss_winner,
            FeatureColumn::TossDecision => &record.toss_decision,
            FeatureColumn::City => &record.city,
        }
    }

    /// Column names in feature order
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|c| c.name().to_string()).collect()
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureColumn::from_name(s).ok_or_else(|| {
            format!(
                "Unknown column: {}. Use one of: {}",
                s,
                FeatureColumn::names().join(", ")
            )
        })
    }
}

/// Encoded pre-match factors in feature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureVector([u32; FeatureVector::DIM]);

impl FeatureVector {
    /// Dimension of feature vector
    pub const DIM: usize = 5;

    pub fn new(codes: [u32; Self::DIM]) -> Self {
        FeatureVector(codes)
    }

    /// Copy with two columns exchanged
    pub fn swapped(&self, a: FeatureColumn, b: FeatureColumn) -> Self {
        let mut codes = self.0;
        codes.swap(a.index(), b.index());
        FeatureVector(codes)
    }

    /// Model input row
    pub fn to_vec(&self) -> Vec<f32> {
        self.0.iter().map(|&c| c as f32).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_declared_order() {
        for (i, column) in FeatureColumn::ALL.iter().enumerate() {
            assert_eq!(column.index(), i);
        }
        assert_eq!(
            FeatureColumn::names(),
            vec!["team1", "team2", "toss_winner", "toss_decision", "city"]
        );
    }

    #[test]
    fn test_parse_column_names() {
        assert_eq!("toss-decision".parse::<FeatureColumn>(), Ok(FeatureColumn::TossDecision));
        assert_eq!("CITY".parse::<FeatureColumn>(), Ok(FeatureColumn::City));
        assert!("venue".parse::<FeatureColumn>().is_err());
    }

    #[test]
    fn test_value_of_context() {
        let ctx = MatchContext::new("MI", "CSK", "CSK", "field", "Mumbai");
        let values: Vec<&str> = FeatureColumn::ALL.iter().map(|c| c.value_of(&ctx)).collect();
        assert_eq!(values, vec!["MI", "CSK", "CSK", "field", "Mumbai"]);
    }

    #[test]
    fn test_swapped() {
        let v = FeatureVector::new([0, 1, 2, 3, 4]);
        let s = v.swapped(FeatureColumn::Team1, FeatureColumn::City);
        assert_eq!(s.to_vec(), vec![4.0, 1.0, 2.0, 3.0, 0.0]);
        assert_eq!(v.to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}
