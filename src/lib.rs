//! Cricket match winner prediction
//!
//! Label-encodes pre-match factors (teams, toss, city), fits a gradient-boosted
//! tree classifier on historical matches and serves single-match predictions
//! from a verified artifact bundle. Also computes descriptive match insights.

pub mod data;
pub mod features;
pub mod insights;
pub mod model;
pub mod predict;
pub mod training;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Sentinel used for a missing city
pub const UNKNOWN_CITY: &str = "Unknown";

/// A single cleaned, labeled historical match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub team1: String,
    pub team2: String,
    pub toss_winner: String,
    pub toss_decision: String,
    pub city: String,
    /// Empty when the dataset has no venue for the match
    pub venue: String,
    pub season_id: Option<u32>,
    pub win_by_runs: f64,
    pub win_by_wickets: f64,
    pub winner: String,
}

impl MatchRecord {
    /// The pre-match factors of this match
    pub fn context(&self) -> MatchContext {
        MatchContext {
            team1: self.team1.clone(),
            team2: self.team2.clone(),
            toss_winner: self.toss_winner.clone(),
            toss_decision: self.toss_decision.clone(),
            city: self.city.clone(),
        }
    }

    /// Check whether the team played in this match
    pub fn involves(&self, team: &str) -> bool {
        self.team1 == team || self.team2 == team
    }

    /// Check if the given team won this match
    pub fn did_win(&self, team: &str) -> Option<bool> {
        if self.involves(team) {
            Some(self.winner == team)
        } else {
            None
        }
    }
}

/// Pre-match factors for one (historical or hypothetical) match
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchContext {
    pub team1: String,
    pub team2: String,
    pub toss_winner: String,
    pub toss_decision: String,
    pub city: String,
}

impl MatchContext {
    pub fn new(
        team1: impl Into<String>,
        team2: impl Into<String>,
        toss_winner: impl Into<String>,
        toss_decision: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        MatchContext {
            team1: team1.into(),
            team2: team2.into(),
            toss_winner: toss_winner.into(),
            toss_decision: toss_decision.into(),
            city: city.into(),
        }
    }

    /// Check the matchup itself: two distinct teams, toss won by one of them
    pub fn check_matchup(&self) -> Result<()> {
        if self.team1 == self.team2 {
            return Err(CricketError::InvalidMatchup(format!(
                "'{}' cannot play itself",
                self.team1
            )));
        }
        if self.toss_winner != self.team1 && self.toss_winner != self.team2 {
            return Err(CricketError::InvalidMatchup(format!(
                "toss winner '{}' is neither '{}' nor '{}'",
                self.toss_winner, self.team1, self.team2
            )));
        }
        Ok(())
    }
}

impl fmt::Display for MatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} at {} ({} won the toss, chose to {})",
            self.team1, self.team2, self.city, self.toss_winner, self.toss_decision
        )
    }
}

/// Model prediction output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub context: MatchContext,
    pub winner: String,
    /// Class probability of the predicted winner
    pub confidence: f32,
}

impl MatchPrediction {
    /// False when the model picked a team outside the matchup, which can only
    /// happen if the training data recorded such a winner.
    pub fn winner_in_matchup(&self) -> bool {
        self.winner == self.context.team1 || self.winner == self.context.team2
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum CricketError {
    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Need at least two distinct match winners to train, found {found}")]
    InsufficientLabels { found: usize },

    #[error("Not enough data: {0}")]
    InsufficientData(String),

    #[error("Failed to load artifacts from {path}: {message}")]
    ArtifactLoad { path: String, message: String },

    #[error("Unseen {column} value '{value}' (not present at training time)")]
    UnseenCategory { column: String, value: String },

    #[error("Code {code} is out of range for {column} ({classes} known classes)")]
    UnknownCode {
        column: String,
        code: usize,
        classes: usize,
    },

    #[error("Invalid matchup: {0}")]
    InvalidMatchup(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CricketError {
    pub fn artifact(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        CricketError::ArtifactLoad {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CricketError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub training: TrainingConfig,
    pub model: ModelConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Use only the first N raw rows; `None` trains on the whole file
    #[serde(default)]
    pub sample_size: Option<usize>,
    pub test_fraction: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Smallest number of rows a tree leaf may hold
    pub min_leaf_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub dataset_path: String,
    pub model_dir: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            n_estimators: 10,
            learning_rate: 0.3,
            max_depth: 6,
            min_leaf_size: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            training: TrainingConfig {
                sample_size: Some(1100),
                test_fraction: 0.2,
                seed: 42,
            },
            model: ModelConfig::default(),
            data: DataConfig {
                dataset_path: "data/ipl_data.csv".to_string(),
                model_dir: "model".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CricketError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| CricketError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CricketError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the training pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if !(0.0..1.0).contains(&t.test_fraction) {
            return Err(CricketError::Config(format!(
                "training.test_fraction must be in [0, 1), got {}",
                t.test_fraction
            )));
        }
        if t.sample_size == Some(0) {
            return Err(CricketError::Config(
                "training.sample_size must be positive".to_string(),
            ));
        }
        let m = &self.model;
        if m.n_estimators == 0 {
            return Err(CricketError::Config(
                "model.n_estimators must be positive".to_string(),
            ));
        }
        if !m.learning_rate.is_finite() || m.learning_rate <= 0.0 {
            return Err(CricketError::Config(format!(
                "model.learning_rate must be a positive finite number, got {}",
                m.learning_rate
            )));
        }
        if m.max_depth == 0 || m.min_leaf_size == 0 {
            return Err(CricketError::Config(
                "model.max_depth and model.min_leaf_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_matchup() {
        let ok = MatchContext::new("Mumbai", "Chennai", "Chennai", "field", "Pune");
        assert!(ok.check_matchup().is_ok());

        let same = MatchContext::new("Mumbai", "Mumbai", "Mumbai", "bat", "Pune");
        assert!(matches!(
            same.check_matchup(),
            Err(CricketError::InvalidMatchup(_))
        ));

        let outsider = MatchContext::new("Mumbai", "Chennai", "Delhi", "bat", "Pune");
        assert!(matches!(
            outsider.check_matchup(),
            Err(CricketError::InvalidMatchup(_))
        ));
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_without_sample_size_uses_all_rows() {
        let text = r#"
            [training]
            test_fraction = 0.25
            seed = 7

            [model]
            n_estimators = 5
            learning_rate = 0.1
            max_depth = 3
            min_leaf_size = 2

            [data]
            dataset_path = "matches.csv"
            model_dir = "artifacts"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.training.sample_size, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_fraction() {
        let mut config = Config::default();
        config.training.test_fraction = 1.0;
        assert!(matches!(config.validate(), Err(CricketError::Config(_))));
    }

    #[test]
    fn test_config_rejects_non_finite_learning_rate() {
        let text = toml::to_string_pretty(&Config::default())
            .unwrap()
            .replace("learning_rate = 0.3", "learning_rate = nan");
        let config: Config = toml::from_str(&text).unwrap();
        assert!(config.model.learning_rate.is_nan());
        assert!(matches!(config.validate(), Err(CricketError::Config(_))));

        let mut config = Config::default();
        config.model.learning_rate = f64::INFINITY;
        assert!(matches!(config.validate(), Err(CricketError::Config(_))));
    }

    #[test]
    fn test_config_rejects_zero_leaf_size() {
        let mut config = Config::default();
        config.model.min_leaf_size = 0;
        assert!(matches!(config.validate(), Err(CricketError::Config(_))));
    }

    #[test]
    fn test_record_helpers() {
        let record = MatchRecord {
            team1: "Mumbai".to_string(),
            team2: "Chennai".to_string(),
            toss_winner: "Mumbai".to_string(),
            toss_decision: "bat".to_string(),
            city: "Mumbai".to_string(),
            venue: "Wankhede Stadium, Mumbai".to_string(),
            season_id: Some(2019),
            win_by_runs: 0.0,
            win_by_wickets: 5.0,
            winner: "Chennai".to_string(),
        };
        assert_eq!(record.did_win("Chennai"), Some(true));
        assert_eq!(record.did_win("Mumbai"), Some(false));
        assert_eq!(record.did_win("Delhi"), None);
        assert_eq!(record.context().toss_winner, "Mumbai");
    }
}
