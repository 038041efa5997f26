//! Model inference for predictions

use std::path::Path;

use crate::features::{FeatureColumn, FeatureVector};
use crate::model::classifier::argmax;
use crate::model::{ArtifactBundle, BundleManifest};
use crate::training::Metrics;
use crate::{MatchContext, MatchPrediction, MatchRecord, Result};

/// Predictor for making match predictions.
///
/// Holds a verified artifact bundle and never mutates it; one instance serves
/// any number of predictions.
#[derive(Debug)]
pub struct Predictor {
    bundle: ArtifactBundle,
}

/// Result of scoring a bundle against historical matches
#[derive(Debug, Clone, Default)]
pub struct ScoreReport {
    pub metrics: Metrics,
    /// Records with a value or winner the bundle never saw
    pub skipped: usize,
}

impl Predictor {
    /// Create a new predictor
    pub fn new(bundle: ArtifactBundle) -> Self {
        Predictor { bundle }
    }

    /// Load predictor from a saved bundle directory
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::new(ArtifactBundle::load(dir)?))
    }

    pub fn manifest(&self) -> &BundleManifest {
        &self.bundle.manifest
    }

    /// Valid values for a feature column, in code order
    pub fn options(&self, column: FeatureColumn) -> &[String] {
        self.bundle.feature_encoders.get(column).classes()
    }

    /// Known team2 values other than `team1`
    pub fn team2_options(&self, team1: &str) -> Vec<&str> {
        self.options(FeatureColumn::Team2)
            .iter()
            .map(String::as_str)
            .filter(|t| *t != team1)
            .collect()
    }

    /// The two teams, restricted to values the toss encoder knows
    pub fn toss_winner_options<'a>(&self, team1: &'a str, team2: &'a str) -> Vec<&'a str> {
        let toss = self.bundle.feature_encoders.get(FeatureColumn::TossWinner);
        [team1, team2]
            .into_iter()
            .filter(|t| toss.contains(t))
            .collect()
    }

    /// Check a context and encode it in feature order
    pub fn validate(&self, context: &MatchContext) -> Result<FeatureVector> {
        context.check_matchup()?;
        self.bundle.feature_encoders.encode(context)
    }

    /// Predict the winner of a single match
    pub fn predict(&self, context: &MatchContext) -> Result<MatchPrediction> {
        let features = self.validate(context)?;
        let (winner, confidence) = self.classify(&features)?;

        let prediction = MatchPrediction {
            context: context.clone(),
            winner,
            confidence: confidence as f32,
        };
        if !prediction.winner_in_matchup() {
            log::warn!(
                "Predicted winner '{}' did not play in {}",
                prediction.winner,
                context
            );
        }
        Ok(prediction)
    }

    /// Predict several matches; each failure stays with its own entry
    pub fn predict_many(&self, contexts: &[MatchContext]) -> Vec<Result<MatchPrediction>> {
        contexts.iter().map(|c| self.predict(c)).collect()
    }

    /// Run the classifier on an already encoded vector and decode the winner
    pub fn classify(&self, features: &FeatureVector) -> Result<(String, f64)> {
        let probs = self.bundle.model.predict_proba(&features.to_vec())?;
        let code = argmax(&probs);
        let winner = self.bundle.label_encoder.decode(code)?.to_string();
        Ok((winner, probs[code]))
    }

    /// Score the bundle against historical records
    pub fn score(&self, records: &[MatchRecord]) -> Result<ScoreReport> {
        let mut report = ScoreReport::default();
        for record in records {
            let encoded = self
                .bundle
                .feature_encoders
                .encode_record(record)
                .and_then(|f| Ok((f, self.bundle.label_encoder.encode(&record.winner)?)));
            match encoded {
                Ok((features, label)) => {
                    let probs = self.bundle.model.predict_proba(&features.to_vec())?;
                    report.metrics.update(&probs, label);
                }
                Err(e) => {
                    log::debug!("Skipping {}: {}", record.context(), e);
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }
}

/// Format prediction for display
pub fn format_prediction(pred: &MatchPrediction) -> String {
    let ctx = &pred.context;
    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}
├─────────────────────────────────────────────────┤
│  City:             {}
│  Toss:             {} chose to {}
│  Predicted winner: {}
│  Confidence:       {:.1}%
└─────────────────────────────────────────────────┘
"#,
        ctx.team1,
        ctx.team2,
        ctx.city,
        ctx.toss_winner,
        ctx.toss_decision,
        pred.winner,
        pred.confidence * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MatchDataset;
    use crate::testing::{record, scratch_dir, small_bundle};
    use crate::training::Trainer;
    use crate::{Config, CricketError};

    fn train(records: Vec<MatchRecord>, test_fraction: f64) -> Predictor {
        let mut config = Config::default();
        config.training.test_fraction = test_fraction;
        let outcome = Trainer::new(config)
            .train(&MatchDataset::from_records(records))
            .unwrap();
        Predictor::new(outcome.bundle)
    }

    #[test]
    fn test_each_context_predicts_its_own_winner() {
        let mut records = vec![record("TeamA", "TeamB", "TeamA", "bat", "X", "TeamA"); 3];
        records.push(record("TeamB", "TeamA", "TeamB", "field", "Y", "TeamB"));

        let dir = scratch_dir("predict-end-to-end");
        let mut config = Config::default();
        config.training.test_fraction = 0.0;
        Trainer::new(config)
            .train_and_save(&MatchDataset::from_records(records), &dir)
            .unwrap();

        let predictor = Predictor::load(&dir).unwrap();
        assert_eq!(predictor.manifest().summary.training_rows, 4);

        let majority = predictor
            .predict(&MatchContext::new("TeamA", "TeamB", "TeamA", "bat", "X"))
            .unwrap();
        assert_eq!(majority.winner, "TeamA");
        assert!(majority.confidence > 0.5);
        assert!(majority.winner_in_matchup());

        // A constant-prior model would say TeamA here too
        let minority = predictor
            .predict(&MatchContext::new("TeamB", "TeamA", "TeamB", "field", "Y"))
            .unwrap();
        assert_eq!(minority.winner, "TeamB");
        assert!(minority.confidence > 0.5);
    }

    #[test]
    fn test_team_columns_are_order_sensitive() {
        // team1 always wins, whoever won the toss
        let mut records = Vec::new();
        for _ in 0..3 {
            records.push(record("A", "B", "A", "bat", "X", "A"));
            records.push(record("A", "B", "B", "bat", "X", "A"));
            records.push(record("B", "A", "A", "bat", "X", "B"));
            records.push(record("B", "A", "B", "bat", "X", "B"));
        }
        let predictor = train(records, 0.0);

        let ctx = MatchContext::new("A", "B", "A", "bat", "X");
        let features = predictor.validate(&ctx).unwrap();
        assert_eq!(predictor.predict(&ctx).unwrap().winner, "A");

        let swapped = features.swapped(FeatureColumn::Team1, FeatureColumn::Team2);
        assert_ne!(swapped, features);
        assert_eq!(predictor.classify(&swapped).unwrap().0, "B");
    }

    #[test]
    fn test_unseen_value_fails_and_predictor_recovers() {
        let predictor = Predictor::new(small_bundle(&["A", "B"]));

        let err = predictor
            .predict(&MatchContext::new("A", "B", "A", "bat", "Atlantis"))
            .unwrap_err();
        assert!(matches!(
            err,
            CricketError::UnseenCategory { ref column, ref value } if column == "city" && value == "Atlantis"
        ));

        let ok = predictor.predict(&MatchContext::new("A", "B", "A", "bat", "X"));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_invalid_matchups_are_rejected() {
        let predictor = Predictor::new(small_bundle(&["A", "B", "C"]));

        assert!(matches!(
            predictor.predict(&MatchContext::new("A", "A", "A", "bat", "X")),
            Err(CricketError::InvalidMatchup(_))
        ));
        assert!(matches!(
            predictor.predict(&MatchContext::new("A", "B", "C", "bat", "X")),
            Err(CricketError::InvalidMatchup(_))
        ));
    }

    #[test]
    fn test_predict_many_keeps_going() {
        let predictor = Predictor::new(small_bundle(&["A", "B"]));
        let results = predictor.predict_many(&[
            MatchContext::new("A", "Z", "A", "bat", "X"),
            MatchContext::new("B", "A", "B", "bat", "X"),
        ]);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_options() {
        let predictor = Predictor::new(small_bundle(&["C", "A", "B"]));
        assert_eq!(predictor.options(FeatureColumn::Team1), &["A", "B", "C"]);
        assert_eq!(predictor.options(FeatureColumn::TossDecision), &["bat"]);
        assert_eq!(predictor.team2_options("B"), vec!["A", "C"]);
        assert_eq!(predictor.toss_winner_options("A", "C"), vec!["A", "C"]);
        assert_eq!(predictor.toss_winner_options("A", "Z"), vec!["A"]);
    }

    #[test]
    fn test_score_skips_unseen_records() {
        let predictor = Predictor::new(small_bundle(&["A", "B"]));
        let records = vec![
            record("A", "B", "A", "bat", "X", "A"),
            record("B", "A", "B", "bat", "X", "B"),
            record("A", "B", "A", "bat", "Elsewhere", "A"),
            record("A", "B", "A", "bat", "X", "Nobody"),
        ];
        let report = predictor.score(&records).unwrap();
        assert_eq!(report.metrics.total, 2);
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn test_format_prediction() {
        let pred = MatchPrediction {
            context: MatchContext::new("A", "B", "A", "bat", "X"),
            winner: "A".to_string(),
            confidence: 0.75,
        };
        let text = format_prediction(&pred);
        assert!(text.contains("A vs B"));
        assert!(text.contains("Predicted winner: A"));
        assert!(text.contains("75.0%"));
    }
}
