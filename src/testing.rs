//! Shared fixtures for unit tests

use std::path::PathBuf;

use crate::features::{CategoryEncoder, EncoderSet, LABEL_COLUMN};
use crate::model::bundle::{ArtifactBundle, TrainingSummary};
use crate::model::GradientBoostedClassifier;
use crate::{MatchRecord, ModelConfig};

pub(crate) fn record(
    team1: &str,
    team2: &str,
    toss_winner: &str,
    toss_decision: &str,
    city: &str,
    winner: &str,
) -> MatchRecord {
    MatchRecord {
        team1: team1.to_string(),
        team2: team2.to_string(),
        toss_winner: toss_winner.to_string(),
        toss_decision: toss_decision.to_string(),
        city: city.to_string(),
        venue: String::new(),
        season_id: None,
        win_by_runs: 0.0,
        win_by_wickets: 0.0,
        winner: winner.to_string(),
    }
}

/// Fresh empty directory under the system temp dir
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cricket-test-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Small trained bundle where team1 always wins, over every ordered pair of `teams`
pub(crate) fn small_bundle(teams: &[&str]) -> ArtifactBundle {
    let mut records = Vec::new();
    for t1 in teams {
        for t2 in teams {
            if t1 != t2 {
                records.push(record(t1, t2, t1, "bat", "X", t1));
            }
        }
    }

    let encoders = EncoderSet::fit(&records);
    let label = CategoryEncoder::fit(LABEL_COLUMN, records.iter().map(|r| &r.winner));
    let rows: Vec<Vec<f32>> = records
        .iter()
        .map(|r| encoders.encode_record(r).unwrap().to_vec())
        .collect();
    let labels: Vec<usize> = records.iter().map(|r| label.encode(&r.winner).unwrap()).collect();

    let params = ModelConfig {
        n_estimators: 3,
        ..ModelConfig::default()
    };
    let model = GradientBoostedClassifier::fit(&rows, &labels, label.len(), &params).unwrap();

    let summary = TrainingSummary {
        training_rows: records.len(),
        heldout_rows: 0,
        heldout_accuracy: None,
        sample_size: None,
    };
    ArtifactBundle::new(model, encoders, label, summary).unwrap()
}
