//! Numerically stable softmax.
//!
//! The maximum logit is subtracted before exponentiating, so the largest
//! shifted value is `exp(0) = 1` and no term can overflow.

use aiwire_core::LabelProbabilities;

use crate::AiError;

/// Convert logits into a probability distribution of the same length.
///
/// Output entries are in `[0, 1]`, sum to 1, and keep the rank order of the
/// input. Fails on an empty slice or on any non-finite logit.
pub fn softmax(logits: &[f32]) -> Result<Vec<f32>, AiError> {
    if logits.is_empty() {
        return Err(AiError::InvalidInput(
            "softmax of an empty vector is undefined".into(),
        ));
    }
    if let Some(i) = logits.iter().position(|x| !x.is_finite()) {
        return Err(AiError::InvalidInput(format!(
            "logit {i} is not finite: {}",
            logits[i]
        )));
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    // Accumulate in f64: an f32 running sum loses the small terms of long vectors.
    let exps: Vec<f64> = logits
        .iter()
        .map(|&x| f64::from(x - max).exp())
        .collect();
    // At least one term is exp(0) = 1, so the sum is never zero.
    let sum: f64 = exps.iter().sum();

    Ok(exps.into_iter().map(|e| (e / sum) as f32).collect())
}

/// Softmax over `logits`, paired with `labels` in the same order.
pub fn softmax_labeled<S: Into<String>>(
    labels: impl IntoIterator<Item = S>,
    logits: &[f32],
) -> Result<LabelProbabilities, AiError> {
    let probs = softmax(logits)?;
    Ok(LabelProbabilities::new(labels, &probs)?)
}
