//! Training pipeline
//!
//! Fits the encoders on every labeled match, holds out a seeded fraction of
//! the rows, fits the boosted classifier and packages the result as an
//! artifact bundle.

use std::collections::BTreeSet;
use std::path::Path;

use crate::data::MatchDataset;
use crate::features::{CategoryEncoder, EncoderSet, LABEL_COLUMN};
use crate::model::{ArtifactBundle, GradientBoostedClassifier, TrainingSummary};
use crate::training::metrics::{evaluate, Metrics};
use crate::training::split::train_test_split;
use crate::{Config, CricketError, Result};

/// One encoded training example
#[derive(Debug, Clone)]
struct Example {
    row: Vec<f32>,
    label: usize,
}

/// Everything a finished training run produced
#[derive(Debug)]
pub struct TrainingOutcome {
    pub bundle: ArtifactBundle,
    pub train: Metrics,
    /// None when `test_fraction` is zero
    pub heldout: Option<Metrics>,
}

/// Trainer for the winner classifier
pub struct Trainer {
    config: Config,
}

impl Trainer {
    pub fn new(config: Config) -> Self {
        Trainer { config }
    }

    /// Train on a cleaned dataset. Nothing is written to disk.
    pub fn train(&self, dataset: &MatchDataset) -> Result<TrainingOutcome> {
        self.config.validate()?;

        let records = dataset.records();
        if records.is_empty() {
            return Err(CricketError::InsufficientData(
                "dataset has no labeled matches".to_string(),
            ));
        }

        let winners: BTreeSet<&str> = records.iter().map(|r| r.winner.as_str()).collect();
        if winners.len() < 2 {
            return Err(CricketError::InsufficientLabels {
                found: winners.len(),
            });
        }

        // Encoders see every labeled row so held-out rows always encode
        let feature_encoders = EncoderSet::fit(records);
        let label_encoder = CategoryEncoder::fit(LABEL_COLUMN, records.iter().map(|r| &r.winner));
        log::info!(
            "Fitted encoders: {} ({} winner classes)",
            feature_encoders
                .iter()
                .map(|(column, e)| format!("{}={}", column, e.len()))
                .collect::<Vec<_>>()
                .join(", "),
            label_encoder.len()
        );

        let examples = records
            .iter()
            .map(|r| {
                Ok(Example {
                    row: feature_encoders.encode_record(r)?.to_vec(),
                    label: label_encoder.encode(&r.winner)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let training = &self.config.training;
        let split = train_test_split(&examples, training.test_fraction, training.seed)?;
        let (train_rows, train_labels) = unzip(&split.train);
        let (test_rows, test_labels) = unzip(&split.test);

        let params = &self.config.model;
        log::info!(
            "Fitting {} boosting rounds per class on {} rows",
            params.n_estimators,
            train_rows.len()
        );
        let model =
            GradientBoostedClassifier::fit(&train_rows, &train_labels, label_encoder.len(), params)?;

        let train = evaluate(&model, &train_rows, &train_labels)?;
        log::info!("Train {}", train);

        let heldout = if test_rows.is_empty() {
            None
        } else {
            Some(evaluate(&model, &test_rows, &test_labels)?)
        };
        match &heldout {
            Some(m) => log::info!("Held-out {}", m),
            None => log::info!("No held-out rows; accuracy not estimated"),
        }

        let summary = TrainingSummary {
            training_rows: train_rows.len(),
            heldout_rows: test_rows.len(),
            heldout_accuracy: heldout.as_ref().map(Metrics::accuracy),
            sample_size: training.sample_size,
        };
        let bundle = ArtifactBundle::new(model, feature_encoders, label_encoder, summary)?;

        Ok(TrainingOutcome {
            bundle,
            train,
            heldout,
        })
    }

    /// Train and write the bundle. A failed run leaves `dir` untouched.
    pub fn train_and_save<P: AsRef<Path>>(
        &self,
        dataset: &MatchDataset,
        dir: P,
    ) -> Result<TrainingOutcome> {
        let outcome = self.train(dataset)?;
        outcome.bundle.save(dir)?;
        Ok(outcome)
    }
}

fn unzip(examples: &[Example]) -> (Vec<Vec<f32>>, Vec<usize>) {
    examples.iter().map(|e| (e.row.clone(), e.label)).unzip()
}
