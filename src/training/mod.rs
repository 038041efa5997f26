//! Model training
//!
//! Held-out split, classifier fitting and metrics.

pub mod metrics;
pub mod split;
pub mod trainer;

pub use metrics::Metrics;
pub use split::{train_test_split, HeldOutSplit};
pub use trainer::{Trainer, TrainingOutcome};
