//! Artifact bundle persistence
//!
//! The classifier, the feature encoders and the winner encoder are written
//! together with a manifest that pins the hash of each file. The manifest is
//! written last and removed first, so a bundle whose write was interrupted,
//! or whose files come from different training runs, fails to load.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::classifier::GradientBoostedClassifier;
use crate::features::{CategoryEncoder, EncoderSet, FeatureColumn, FeatureVector, LABEL_COLUMN};
use crate::{CricketError, Result};

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const FEATURE_ENCODERS_FILE: &str = "feature_encoders.json";
pub const LABEL_ENCODER_FILE: &str = "winner_encoder.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Bumped whenever the on-disk layout changes
pub const FORMAT_VERSION: u32 = 1;

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Facts about the training run that produced a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub training_rows: usize,
    pub heldout_rows: usize,
    /// None when nothing was held out
    pub heldout_accuracy: Option<f64>,
    pub sample_size: Option<usize>,
}

/// Written last; ties the three artifacts to one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub feature_columns: Vec<String>,
    pub classifier_sha256: String,
    pub feature_encoders_sha256: String,
    pub label_encoder_sha256: String,
    /// Hash of every encoder's class list
    pub encoder_fingerprint: String,
    pub n_classes: usize,
    pub summary: TrainingSummary,
}

/// Serialized artifact files
struct Blobs {
    classifier: Vec<u8>,
    feature_encoders: Vec<u8>,
    label_encoder: Vec<u8>,
}

impl Blobs {
    fn encode(
        model: &GradientBoostedClassifier,
        feature_encoders: &EncoderSet,
        label_encoder: &CategoryEncoder,
    ) -> Result<Self> {
        Ok(Blobs {
            classifier: serde_json::to_vec(model)?,
            feature_encoders: serde_json::to_vec_pretty(feature_encoders)?,
            label_encoder: serde_json::to_vec_pretty(label_encoder)?,
        })
    }

    fn files(&self) -> [(&'static str, &[u8]); 3] {
        [
            (CLASSIFIER_FILE, self.classifier.as_slice()),
            (FEATURE_ENCODERS_FILE, self.feature_encoders.as_slice()),
            (LABEL_ENCODER_FILE, self.label_encoder.as_slice()),
        ]
    }
}

/// Classifier plus the encoders it was trained against
#[derive(Debug)]
pub struct ArtifactBundle {
    pub model: GradientBoostedClassifier,
    pub feature_encoders: EncoderSet,
    pub label_encoder: CategoryEncoder,
    pub manifest: BundleManifest,
}

impl ArtifactBundle {
    /// Assemble a bundle from a finished training run
    pub fn new(
        model: GradientBoostedClassifier,
        feature_encoders: EncoderSet,
        label_encoder: CategoryEncoder,
        summary: TrainingSummary,
    ) -> Result<Self> {
        // Anything `load` would reject must not reach disk
        model.validate().map_err(CricketError::Model)?;
        check_consistency(&model, &feature_encoders, &label_encoder).map_err(CricketError::Model)?;

        let blobs = Blobs::encode(&model, &feature_encoders, &label_encoder)?;
        let manifest = BundleManifest {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            feature_columns: FeatureColumn::names(),
            classifier_sha256: sha256_hex(&blobs.classifier),
            feature_encoders_sha256: sha256_hex(&blobs.feature_encoders),
            label_encoder_sha256: sha256_hex(&blobs.label_encoder),
            encoder_fingerprint: feature_encoders.fingerprint_with(&label_encoder),
            n_classes: label_encoder.len(),
            summary,
        };

        Ok(ArtifactBundle {
            model,
            feature_encoders,
            label_encoder,
            manifest,
        })
    }

    /// Write all artifacts into `dir`, manifest last
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        let blobs = Blobs::encode(&self.model, &self.feature_encoders, &self.label_encoder)?;
        if sha256_hex(&blobs.classifier) != self.manifest.classifier_sha256 {
            return Err(CricketError::Model(
                "classifier changed after the manifest was built".to_string(),
            ));
        }

        begin_write(dir)?;
        for (name, bytes) in blobs.files() {
            write_artifact(dir, name, bytes)?;
        }
        let manifest = serde_json::to_vec_pretty(&self.manifest)?;
        write_artifact(dir, MANIFEST_FILE, &manifest)?;

        log::info!("Saved artifact bundle to {}", dir.display());
        Ok(())
    }

    /// Load and verify a bundle written by [`ArtifactBundle::save`]
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let manifest = Self::load_manifest(dir)?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(CricketError::artifact(
                dir,
                format!(
                    "bundle format version {} is not supported (expected {})",
                    manifest.format_version, FORMAT_VERSION
                ),
            ));
        }
        if manifest.feature_columns != FeatureColumn::names() {
            return Err(CricketError::artifact(
                dir,
                format!(
                    "bundle feature order {:?} does not match {:?}",
                    manifest.feature_columns,
                    FeatureColumn::names()
                ),
            ));
        }

        let classifier = read_verified(dir, CLASSIFIER_FILE, &manifest.classifier_sha256)?;
        let encoders = read_verified(dir, FEATURE_ENCODERS_FILE, &manifest.feature_encoders_sha256)?;
        let label = read_verified(dir, LABEL_ENCODER_FILE, &manifest.label_encoder_sha256)?;

        let model: GradientBoostedClassifier = parse(dir, CLASSIFIER_FILE, &classifier)?;
        let feature_encoders: EncoderSet = parse(dir, FEATURE_ENCODERS_FILE, &encoders)?;
        let label_encoder: CategoryEncoder = parse(dir, LABEL_ENCODER_FILE, &label)?;

        model
            .validate()
            .map_err(|e| CricketError::artifact(dir, format!("{}: {}", CLASSIFIER_FILE, e)))?;
        check_consistency(&model, &feature_encoders, &label_encoder)
            .map_err(|e| CricketError::artifact(dir, e))?;

        if feature_encoders.fingerprint_with(&label_encoder) != manifest.encoder_fingerprint {
            return Err(CricketError::artifact(
                dir,
                "encoder classes do not match the manifest fingerprint",
            ));
        }

        log::info!(
            "Loaded artifact bundle from {} ({} classes, {} rounds, trained {})",
            dir.display(),
            label_encoder.len(),
            model.params().n_estimators,
            manifest.created_at.format("%Y-%m-%d %H:%M UTC")
        );

        Ok(ArtifactBundle {
            model,
            feature_encoders,
            label_encoder,
            manifest,
        })
    }

    /// Read only the manifest
    pub fn load_manifest<P: AsRef<Path>>(dir: P) -> Result<BundleManifest> {
        let dir = dir.as_ref();
        let path = dir.join(MANIFEST_FILE);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CricketError::artifact(
                    dir,
                    "bundle incomplete: manifest.json is missing (training never finished here?)",
                ));
            }
            Err(e) => return Err(CricketError::artifact(dir, format!("{}: {}", MANIFEST_FILE, e))),
        };
        parse(dir, MANIFEST_FILE, &bytes)
    }
}

/// The three artifacts agree on shape
fn check_consistency(
    model: &GradientBoostedClassifier,
    feature_encoders: &EncoderSet,
    label_encoder: &CategoryEncoder,
) -> std::result::Result<(), String> {
    if label_encoder.column() != LABEL_COLUMN {
        return Err(format!(
            "winner encoder was fit on '{}', expected '{}'",
            label_encoder.column(),
            LABEL_COLUMN
        ));
    }
    if model.n_features() != FeatureVector::DIM {
        return Err(format!(
            "classifier takes {} features, expected {}",
            model.n_features(),
            FeatureVector::DIM
        ));
    }
    if model.n_classes() != label_encoder.len() {
        return Err(format!(
            "classifier has {} classes but the winner encoder knows {}",
            model.n_classes(),
            label_encoder.len()
        ));
    }
    if let Some((column, _)) = feature_encoders.iter().find(|(_, e)| e.is_empty()) {
        return Err(format!("encoder for '{}' has no classes", column));
    }
    Ok(())
}

/// Invalidate whatever bundle is in `dir` before overwriting any artifact
pub(crate) fn begin_write(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    match std::fs::remove_file(dir.join(MANIFEST_FILE)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Write through a temporary sibling and rename into place
pub(crate) fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let target = dir.join(name);
    let tmp = dir.join(format!("{}.tmp", name));
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, &target)?;
    log::debug!("Wrote {} ({} bytes)", target.display(), bytes.len());
    Ok(())
}

fn read_verified(dir: &Path, name: &str, expected_sha256: &str) -> Result<Vec<u8>> {
    let bytes = std::fs::read(dir.join(name))
        .map_err(|e| CricketError::artifact(dir, format!("{}: {}", name, e)))?;
    if sha256_hex(&bytes) != expected_sha256 {
        return Err(CricketError::artifact(
            dir,
            format!("{} does not match the manifest (mixed or partial bundle)", name),
        ));
    }
    Ok(bytes)
}

fn parse<T: serde::de::DeserializeOwned>(dir: &Path, name: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| CricketError::artifact(dir, format!("{} is corrupt: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scratch_dir, small_bundle};

    #[test]
    fn test_save_load_roundtrip() {
        let dir = scratch_dir("bundle-roundtrip");
        let bundle = small_bundle(&["A", "B"]);
        bundle.save(&dir).unwrap();

        let loaded = ArtifactBundle::load(&dir).unwrap();
        assert_eq!(loaded.manifest, bundle.manifest);
        assert_eq!(loaded.feature_encoders, bundle.feature_encoders);
        assert_eq!(loaded.label_encoder, bundle.label_encoder);
        assert_eq!(loaded.model.params(), bundle.model.params());
        let row = [0.0; FeatureVector::DIM];
        let (a, b) = (
            loaded.model.predict_proba(&row).unwrap(),
            bundle.model.predict_proba(&row).unwrap(),
        );
        for (x, y) in a.iter().zip(&b) {
            approx::assert_relative_eq!(*x, *y, epsilon = 1e-6);
        }
        assert!(!dir.join(format!("{}.tmp", CLASSIFIER_FILE)).exists());
    }

    #[test]
    fn test_interrupted_write_is_detected() {
        let dir = scratch_dir("bundle-interrupted");
        let old = small_bundle(&["A", "B"]);
        old.save(&dir).unwrap();

        // A retrain that dies after writing the classifier
        let new = small_bundle(&["A", "B", "C"]);
        let blobs = Blobs::encode(&new.model, &new.feature_encoders, &new.label_encoder).unwrap();
        begin_write(&dir).unwrap();
        write_artifact(&dir, CLASSIFIER_FILE, &blobs.classifier).unwrap();

        let err = ArtifactBundle::load(&dir).unwrap_err();
        assert!(matches!(err, CricketError::ArtifactLoad { ref message, .. } if message.contains("incomplete")));
    }

    #[test]
    fn test_mixed_bundle_is_detected() {
        let dir = scratch_dir("bundle-mixed");
        small_bundle(&["A", "B"]).save(&dir).unwrap();

        // Classifier from another run dropped next to an intact manifest
        let other = small_bundle(&["A", "B", "C"]);
        let blobs = Blobs::encode(&other.model, &other.feature_encoders, &other.label_encoder).unwrap();
        write_artifact(&dir, CLASSIFIER_FILE, &blobs.classifier).unwrap();

        let err = ArtifactBundle::load(&dir).unwrap_err();
        assert!(matches!(err, CricketError::ArtifactLoad { ref message, .. } if message.contains(CLASSIFIER_FILE)));
    }

    #[test]
    fn test_missing_encoder_file_is_detected() {
        let dir = scratch_dir("bundle-missing-file");
        small_bundle(&["A", "B"]).save(&dir).unwrap();
        std::fs::remove_file(dir.join(LABEL_ENCODER_FILE)).unwrap();

        assert!(matches!(
            ArtifactBundle::load(&dir),
            Err(CricketError::ArtifactLoad { .. })
        ));
    }

    #[test]
    fn test_empty_directory_is_artifact_error() {
        let dir = scratch_dir("bundle-empty");
        assert!(matches!(
            ArtifactBundle::load(&dir),
            Err(CricketError::ArtifactLoad { .. })
        ));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_unloadable_model_is_not_bundled() {
        let good = small_bundle(&["A", "B"]);
        let mut value = serde_json::to_value(&good.model).unwrap();
        value["models"] = serde_json::json!([{ "Constant": 2.0 }, { "Constant": 0.0 }]);
        let broken: GradientBoostedClassifier = serde_json::from_value(value).unwrap();

        let err = ArtifactBundle::new(
            broken,
            good.feature_encoders.clone(),
            good.label_encoder.clone(),
            good.manifest.summary.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, CricketError::Model(ref m) if m.contains("constant score")));
    }
}
