//! Winner classifier and its persisted artifacts
//!
//! - `classifier`: one-vs-rest boosted-tree classifier over `gbdt` ensembles
//! - `bundle`: classifier + encoders + manifest on disk

pub mod bundle;
pub mod classifier;

pub use bundle::{ArtifactBundle, BundleManifest, TrainingSummary};
pub use classifier::GradientBoostedClassifier;
