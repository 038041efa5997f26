//! Prediction and inference
//!
//! Load a trained bundle and generate predictions.

pub mod inference;

pub use inference::{format_prediction, Predictor, ScoreReport};
