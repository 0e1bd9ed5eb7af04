//! Label → probability mapping produced by a classifier.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Float32Array, StringArray, UInt32Array};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::schema::prediction_schema;

/// One `(label, probability)` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelProbability {
    pub label: String,
    pub probability: f32,
}

/// Probability distribution over a set of unique labels.
///
/// Built once per classification call. Entries keep the order the labels were
/// supplied in; use [`ranked`](Self::ranked) for highest-first order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LabelProbability>", into = "Vec<LabelProbability>")]
pub struct LabelProbabilities {
    entries: Vec<LabelProbability>,
}

impl LabelProbabilities {
    /// Pair labels with probabilities.
    ///
    /// Fails if the lengths differ, a label appears twice, or a probability is
    /// negative or not finite. Probabilities are taken as-is (no renormalization).
    pub fn new<S: Into<String>>(
        labels: impl IntoIterator<Item = S>,
        probabilities: &[f32],
    ) -> Result<Self, CoreError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() != probabilities.len() {
            return Err(CoreError::LengthMismatch {
                labels: labels.len(),
                probabilities: probabilities.len(),
            });
        }
        Self::from_entries(
            labels
                .into_iter()
                .zip(probabilities)
                .map(|(label, &probability)| LabelProbability { label, probability })
                .collect(),
        )
    }

    fn from_entries(entries: Vec<LabelProbability>) -> Result<Self, CoreError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for e in &entries {
            if !e.probability.is_finite() || e.probability < 0.0 {
                return Err(CoreError::InvalidProbability {
                    label: e.label.clone(),
                    probability: e.probability,
                });
            }
            if !seen.insert(e.label.as_str()) {
                return Err(CoreError::DuplicateLabel(e.label.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Probability for `label`, if present.
    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.probability)
    }

    /// Entry with the highest probability. `None` when empty.
    pub fn top(&self) -> Option<&LabelProbability> {
        self.entries
            .iter()
            .max_by(|a, b| a.probability.total_cmp(&b.probability))
    }

    /// Entries sorted by descending probability.
    pub fn ranked(&self) -> Vec<&LabelProbability> {
        let mut out: Vec<&LabelProbability> = self.entries.iter().collect();
        out.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelProbability> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all probabilities (≈ 1.0 for softmax output).
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|e| e.probability).sum()
    }

    /// Ranked entries as an Arrow batch following [`prediction_schema`].
    pub fn to_record_batch(&self) -> Result<RecordBatch, CoreError> {
        let ranked = self.ranked();
        let ranks: UInt32Array = (1..=ranked.len() as u32).collect::<Vec<_>>().into();
        let labels = StringArray::from_iter_values(ranked.iter().map(|e| e.label.as_str()));
        let probs = Float32Array::from_iter_values(ranked.iter().map(|e| e.probability));

        Ok(RecordBatch::try_new(
            Arc::new(prediction_schema()),
            vec![Arc::new(ranks), Arc::new(labels), Arc::new(probs)],
        )?)
    }
}

impl TryFrom<Vec<LabelProbability>> for LabelProbabilities {
    type Error = CoreError;

    fn try_from(entries: Vec<LabelProbability>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<LabelProbabilities> for Vec<LabelProbability> {
    fn from(value: LabelProbabilities) -> Self {
        value.entries
    }
}

impl<'a> IntoIterator for &'a LabelProbabilities {
    type Item = &'a LabelProbability;
    type IntoIter = std::slice::Iter<'a, LabelProbability>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn animals() -> LabelProbabilities {
        LabelProbabilities::new(["cat", "dog", "bird"], &[0.2, 0.7, 0.1]).unwrap()
    }

    #[test]
    fn lookup_by_label() {
        let p = animals();
        assert_eq!(p.len(), 3);
        assert_eq!(p.get("dog"), Some(0.7));
        assert_eq!(p.get("fish"), None);
    }

    #[test]
    fn top_and_ranked() {
        let p = animals();
        assert_eq!(p.top().unwrap().label, "dog");

        let order: Vec<&str> = p.ranked().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(order, vec!["dog", "cat", "bird"]);
    }

    #[test]
    fn keeps_insertion_order() {
        let p = animals();
        let labels: Vec<&str> = p.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["cat", "dog", "bird"]);
    }

    #[test]
    fn rejects_duplicate_label() {
        let err = LabelProbabilities::new(["cat", "cat"], &[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateLabel(l) if l == "cat"));
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = LabelProbabilities::new(["cat"], &[0.5, 0.5]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::LengthMismatch {
                labels: 1,
                probabilities: 2
            }
        ));
    }

    #[test]
    fn rejects_negative_and_nan() {
        let err = LabelProbabilities::new(["a", "b"], &[-3.0, 0.5]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidProbability { label, .. } if label == "a"));

        let err = LabelProbabilities::new(["a", "b"], &[0.5, f32::NAN]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidProbability { label, .. } if label == "b"));

        assert!(LabelProbabilities::new(["a"], &[f32::INFINITY]).is_err());
    }

    #[test]
    fn zero_probability_is_allowed() {
        let p = LabelProbabilities::new(["a", "b"], &[1.0, 0.0]).unwrap();
        assert_eq!(p.get("b"), Some(0.0));
    }

    #[test]
    fn total_sums_entries() {
        assert!((animals().total() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(animals()).unwrap();
        assert_eq!(json[1]["label"], "dog");
        assert!((json[1]["probability"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn json_rejects_duplicates() {
        let json = r#"[{"label":"a","probability":0.5},{"label":"a","probability":0.5}]"#;
        assert!(serde_json::from_str::<LabelProbabilities>(json).is_err());
    }

    #[test]
    fn json_rejects_negative_probability() {
        let json = r#"[{"label":"a","probability":-7.5}]"#;
        let err = serde_json::from_str::<LabelProbabilities>(json).unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn record_batch_is_ranked() {
        let batch = animals().to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 3);

        let labels = batch
            .column_by_name("label")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(labels.value(0), "dog");
        assert_eq!(labels.value(2), "bird");

        let ranks = batch
            .column_by_name("rank")
            .unwrap()
            .as_any()
            .downcast_ref::<UInt32Array>()
            .unwrap();
        assert_eq!(ranks.value(0), 1);
        assert_eq!(ranks.len(), 3);
    }

    #[test]
    fn empty_distribution() {
        let p = LabelProbabilities::new(Vec::<String>::new(), &[]).unwrap();
        assert!(p.is_empty());
        assert!(p.top().is_none());
        assert_eq!(p.to_record_batch().unwrap().num_rows(), 0);
    }
}
