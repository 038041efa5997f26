//! Categorical encoders for match factors
//!
//! Each column gets its own string <-> code mapping, fit once from the
//! training corpus and frozen afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::match_repr::{FeatureColumn, FeatureVector};
use crate::{CricketError, MatchContext, MatchRecord, Result};

/// Column name used for the winner label encoder
pub const LABEL_COLUMN: &str = "match_winner";

/// Bidirectional mapping between the observed values of one column and
/// dense codes `0..k`.
///
/// Classes are kept sorted; a value's code is its position in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncoderRecord")]
pub struct CategoryEncoder {
    column: String,
    classes: Vec<String>,
}

/// Unvalidated on-disk form
#[derive(Deserialize)]
struct EncoderRecord {
    column: String,
    classes: Vec<String>,
}

impl TryFrom<EncoderRecord> for CategoryEncoder {
    type Error = String;

    fn try_from(record: EncoderRecord) -> std::result::Result<Self, Self::Error> {
        if let Some(pair) = record.classes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(format!(
                "encoder for '{}' has unsorted or duplicate classes ('{}', '{}')",
                record.column, pair[0], pair[1]
            ));
        }
        Ok(CategoryEncoder {
            column: record.column,
            classes: record.classes,
        })
    }
}

impl CategoryEncoder {
    /// Fit an encoder from the observed values of a column
    pub fn fit<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();

        CategoryEncoder {
            column: column.into(),
            classes,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Known classes in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.position(value).is_some()
    }

    fn position(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    /// Code for a known value; unseen values are rejected, never coerced
    pub fn encode(&self, value: &str) -> Result<usize> {
        self.position(value)
            .ok_or_else(|| CricketError::UnseenCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    /// Value for a code
    pub fn decode(&self, code: usize) -> Result<&str> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| CricketError::UnknownCode {
                column: self.column.clone(),
                code,
                classes: self.classes.len(),
            })
    }

    /// SHA-256 over the column name and class list
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        self.feed(&mut hasher);
        hex::encode(hasher.finalize())
    }

    fn feed(&self, hasher: &mut Sha256) {
        hasher.update(self.column.as_bytes());
        hasher.update([0u8]);
        for class in &self.classes {
            hasher.update((class.len() as u64).to_le_bytes());
            hasher.update(class.as_bytes());
        }
        hasher.update([0xffu8]);
    }
}

/// Encoders for the five feature columns, one per column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<FeatureColumn, CategoryEncoder>")]
#[serde(into = "BTreeMap<FeatureColumn, CategoryEncoder>")]
pub struct EncoderSet {
    encoders: BTreeMap<FeatureColumn, CategoryEncoder>,
}

impl TryFrom<BTreeMap<FeatureColumn, CategoryEncoder>> for EncoderSet {
    type Error = String;

    fn try_from(
        encoders: BTreeMap<FeatureColumn, CategoryEncoder>,
    ) -> std::result::Result<Self, Self::Error> {
        for column in FeatureColumn::ALL {
            match encoders.get(&column) {
                None => return Err(format!("no encoder for feature column '{}'", column)),
                Some(enc) if enc.column() != column.name() => {
                    return Err(format!(
                        "encoder stored under '{}' was fit on '{}'",
                        column,
                        enc.column()
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(EncoderSet { encoders })
    }
}

impl From<EncoderSet> for BTreeMap<FeatureColumn, CategoryEncoder> {
    fn from(set: EncoderSet) -> Self {
        set.encoders
    }
}

impl EncoderSet {
    /// Fit every feature column independently from the training records
    pub fn fit(records: &[MatchRecord]) -> Self {
        let encoders = FeatureColumn::ALL
            .into_iter()
            .map(|column| {
                let values = records.iter().map(|r| column.value_of_record(r));
                (column, CategoryEncoder::fit(column.name(), values))
            })
            .collect();
        EncoderSet { encoders }
    }

    /// Encoder for a column
    pub fn get(&self, column: FeatureColumn) -> &CategoryEncoder {
        // Every column is present: `fit` creates all five and deserialization
        // rejects a set missing any of them.
        &self.encoders[&column]
    }

    /// Iterate encoders in feature order
    pub fn iter(&self) -> impl Iterator<Item = (FeatureColumn, &CategoryEncoder)> {
        self.encoders.iter().map(|(c, e)| (*c, e))
    }

    /// Encode a match context into the model's feature vector
    pub fn encode(&self, context: &MatchContext) -> Result<FeatureVector> {
        let mut codes = [0u32; FeatureVector::DIM];
        for column in FeatureColumn::ALL {
            let code = self.get(column).encode(column.value_of(context))?;
            codes[column.index()] = code as u32;
        }
        Ok(FeatureVector::new(codes))
    }

    /// Encode the pre-match factors of a historical record
    pub fn encode_record(&self, record: &MatchRecord) -> Result<FeatureVector> {
        self.encode(&record.context())
    }

    /// Combined fingerprint of all feature encoders plus the label encoder
    pub fn fingerprint_with(&self, label: &CategoryEncoder) -> String {
        let mut hasher = Sha256::new();
        for (_, encoder) in self.iter() {
            encoder.feed(&mut hasher);
        }
        label.feed(&mut hasher);
        hex::encode(hasher.finalize())
    }
}
