//! Boosted-tree winner classifier
//!
//! One `gbdt` log-likelihood ensemble per winner class (one-vs-rest). Each
//! ensemble scores P(class | features); the scores are normalised into a
//! class distribution.

use std::fmt;

use ::gbdt::config::Config as BoostConfig;
use ::gbdt::decision_tree::{Data, DataVec, ValueType};
use ::gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};

use crate::{CricketError, ModelConfig, Result};

/// Score floor before normalising
const EPS: f64 = 1e-15;

/// Clamp scores into (0, 1] and rescale them to sum to one
pub fn normalize(scores: &[f64]) -> Vec<f64> {
    let clamped: Vec<f64> = scores.iter().map(|s| s.clamp(EPS, 1.0)).collect();
    let sum: f64 = clamped.iter().sum();
    clamped.into_iter().map(|s| s / sum).collect()
}

/// Index of the largest value; ties go to the lowest index
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Scorer for one class against the rest
#[derive(Serialize, Deserialize)]
enum ClassModel {
    Boosted(GBDT),
    /// The class was always (1.0) or never (0.0) the winner in training
    Constant(f64),
}

impl ClassModel {
    fn fit(rows: &[Vec<f32>], labels: &[usize], class: usize, params: &ModelConfig) -> Self {
        let positives = labels.iter().filter(|&&y| y == class).count();
        if positives == 0 {
            return ClassModel::Constant(0.0);
        }
        if positives == labels.len() {
            return ClassModel::Constant(1.0);
        }

        let mut cfg = BoostConfig::new();
        cfg.set_feature_size(rows[0].len());
        cfg.set_max_depth(params.max_depth as _);
        cfg.set_iterations(params.n_estimators as _);
        cfg.set_shrinkage(params.learning_rate as _);
        cfg.set_min_leaf_size(params.min_leaf_size as _);
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_data_sample_ratio(1.0);
        cfg.set_feature_sample_ratio(1.0);
        cfg.set_training_optimization_level(2);

        // Log-likelihood loss takes labels in {-1, 1}
        let mut data: DataVec = rows
            .iter()
            .zip(labels)
            .map(|(row, &y)| {
                let label = if y == class { 1.0 } else { -1.0 };
                Data::new_training_data(to_values(row), 1.0, label, None)
            })
            .collect();

        let mut model = GBDT::new(&cfg);
        model.fit(&mut data);
        ClassModel::Boosted(model)
    }

    fn score(&self, data: &DataVec) -> f64 {
        match self {
            ClassModel::Boosted(model) => model.predict(data).first().map_or(0.0, |&p| p as f64),
            ClassModel::Constant(p) => *p,
        }
    }
}

fn to_values(row: &[f32]) -> Vec<ValueType> {
    row.iter().map(|&x| x as ValueType).collect()
}

/// Multiclass classifier over a fixed-width feature row
#[derive(Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    n_features: usize,
    n_classes: usize,
    params: ModelConfig,
    /// One scorer per class, in label-code order
    models: Vec<ClassModel>,
}

impl fmt::Debug for GradientBoostedClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientBoostedClassifier")
            .field("n_features", &self.n_features)
            .field("n_classes", &self.n_classes)
            .field("params", &self.params)
            .field("boosted_classes", &self.n_boosted())
            .finish()
    }
}

impl GradientBoostedClassifier {
    /// Train one ensemble per class
    pub fn fit(
        rows: &[Vec<f32>],
        labels: &[usize],
        n_classes: usize,
        params: &ModelConfig,
    ) -> Result<Self> {
        if n_classes < 2 {
            return Err(CricketError::InsufficientLabels { found: n_classes });
        }
        if rows.is_empty() {
            return Err(CricketError::InsufficientData("no training rows".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(CricketError::Model(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let n_features = rows[0].len();
        if n_features == 0 {
            return Err(CricketError::Model("classifier needs at least one feature".to_string()));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != n_features) {
            return Err(CricketError::Model(format!(
                "expected {} features, got {}",
                n_features,
                row.len()
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&y| y >= n_classes) {
            return Err(CricketError::Model(format!(
                "label {} out of range for {} classes",
                bad, n_classes
            )));
        }

        let models: Vec<ClassModel> = (0..n_classes)
            .map(|class| {
                log::debug!("Fitting class {}/{}", class + 1, n_classes);
                ClassModel::fit(rows, labels, class, params)
            })
            .collect();

        let model = GradientBoostedClassifier {
            n_features,
            n_classes,
            params: params.clone(),
            models,
        };
        log::debug!(
            "Boosted {} of {} classes ({} rounds each)",
            model.n_boosted(),
            n_classes,
            params.n_estimators
        );
        Ok(model)
    }

    fn check_width(&self, row: &[f32]) -> Result<()> {
        if row.len() != self.n_features {
            return Err(CricketError::Model(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        Ok(())
    }

    /// Class probabilities for one row
    pub fn predict_proba(&self, row: &[f32]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        let data: DataVec = vec![Data::new_test_data(to_values(row), None)];
        let scores: Vec<f64> = self.models.iter().map(|m| m.score(&data)).collect();
        Ok(normalize(&scores))
    }

    /// Most probable class for one row
    pub fn predict(&self, row: &[f32]) -> Result<usize> {
        Ok(argmax(&self.predict_proba(row)?))
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn params(&self) -> &ModelConfig {
        &self.params
    }

    /// Classes that got an ensemble rather than a constant score
    pub fn n_boosted(&self) -> usize {
        self.models
            .iter()
            .filter(|m| matches!(m, ClassModel::Boosted(_)))
            .count()
    }

    /// Structural check for a freshly trained or loaded model: one scorer
    /// per class, finite parameters, and finite probabilities on an all-zero
    /// row.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.n_classes < 2 {
            return Err(format!("model has {} classes", self.n_classes));
        }
        if self.models.len() != self.n_classes {
            return Err(format!(
                "{} class scorers for {} classes",
                self.models.len(),
                self.n_classes
            ));
        }
        if !self.params.learning_rate.is_finite() {
            return Err(format!("learning rate is {}", self.params.learning_rate));
        }
        for (class, model) in self.models.iter().enumerate() {
            if let ClassModel::Constant(p) = model {
                if !(0.0..=1.0).contains(p) {
                    return Err(format!("class {} has constant score {}", class, p));
                }
            }
        }
        let probs = self
            .predict_proba(&vec![0.0; self.n_features])
            .map_err(|e| e.to_string())?;
        if probs.iter().any(|p| !p.is_finite()) {
            return Err("model produces non-finite probabilities".to_string());
        }
        Ok(())
    }
}
