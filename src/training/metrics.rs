//! Training metrics and evaluation

use std::fmt;

use crate::model::classifier::argmax;
use crate::model::GradientBoostedClassifier;
use crate::Result;

/// Probability floor for log-loss
const EPS: f64 = 1e-15;

/// Classification metrics accumulated over predictions
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Number of correct winner predictions
    pub correct: usize,
    /// Total predictions
    pub total: usize,
    /// Sum of -ln p(true class)
    pub log_loss_sum: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prediction from its class probabilities
    pub fn update(&mut self, probs: &[f64], actual: usize) {
        if argmax(probs) == actual {
            self.correct += 1;
        }
        let p = probs.get(actual).copied().unwrap_or(0.0).max(EPS);
        self.log_loss_sum -= p.ln();
        self.total += 1;
    }

    /// Get winner prediction accuracy
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// Mean multiclass log-loss
    pub fn avg_log_loss(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.log_loss_sum / self.total as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mlogloss: {:.4} | Acc: {:.2}% ({}/{})",
            self.avg_log_loss(),
            self.accuracy() * 100.0,
            self.correct,
            self.total
        )
    }
}

/// Score a model on encoded rows
pub fn evaluate(
    model: &GradientBoostedClassifier,
    rows: &[Vec<f32>],
    labels: &[usize],
) -> Result<Metrics> {
    let mut metrics = Metrics::new();
    for (row, &label) in rows.iter().zip(labels) {
        metrics.update(&model.predict_proba(row)?, label);
    }
    Ok(metrics)
}
