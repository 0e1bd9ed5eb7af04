//! Zero-shot scoring: compare one image embedding against a text embedding per label.
//!
//! Mirrors CLIP's head: cosine similarity scaled by a learned temperature,
//! then softmax across the candidate labels.

use aiwire_core::LabelProbabilities;

use crate::AiError;
use crate::softmax::softmax_labeled;

/// CLIP's learned `logit_scale` after exponentiation.
pub const CLIP_LOGIT_SCALE: f32 = 100.0;

const PROMPT_TEMPLATE: &str = "a photo of a ";

/// Text prompt used to embed a candidate label.
pub fn prompt_for(label: &str) -> String {
    format!("{PROMPT_TEMPLATE}{label}")
}

/// Scores labels for an image by scaled cosine similarity.
#[derive(Debug, Clone, Copy)]
pub struct ZeroShotScorer {
    pub logit_scale: f32,
}

impl Default for ZeroShotScorer {
    fn default() -> Self {
        Self {
            logit_scale: CLIP_LOGIT_SCALE,
        }
    }
}

impl ZeroShotScorer {
    pub fn new(logit_scale: f32) -> Self {
        Self { logit_scale }
    }

    /// One logit per label: `logit_scale * cos(image, label)`.
    pub fn logits(
        &self,
        image_embedding: &[f32],
        label_embeddings: &[(String, Vec<f32>)],
    ) -> Result<Vec<f32>, AiError> {
        if label_embeddings.is_empty() {
            return Err(AiError::InvalidInput("no candidate labels".into()));
        }
        let dim = image_embedding.len();
        let image = normalized(image_embedding);

        label_embeddings
            .iter()
            .map(|(label, emb)| {
                if emb.len() != dim {
                    return Err(AiError::InvalidInput(format!(
                        "embedding for '{label}' has dim {}, image has {dim}",
                        emb.len()
                    )));
                }
                let text = normalized(emb);
                Ok(self.logit_scale * dot(&image, &text))
            })
            .collect()
    }

    /// Softmax over [`logits`](Self::logits), keyed by label.
    pub fn classify(
        &self,
        image_embedding: &[f32],
        label_embeddings: &[(String, Vec<f32>)],
    ) -> Result<LabelProbabilities, AiError> {
        let logits = self.logits(image_embedding, label_embeddings)?;
        softmax_labeled(label_embeddings.iter().map(|(l, _)| l.as_str()), &logits)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// L2-normalized copy. Zero vectors are returned unchanged.
pub(crate) fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    let norm: f32 = out.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in out.iter_mut() {
            *x /= norm;
        }
    }
    out
}
