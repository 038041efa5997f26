//! Feature extraction and encoding
//!
//! Converts pre-match factors into model-ready integer codes.

pub mod encoding;
pub mod match_repr;

pub use encoding::{CategoryEncoder, EncoderSet, LABEL_COLUMN};
pub use match_repr::{FeatureColumn, FeatureVector};
