//! ONNX Runtime pipeline for combined CLIP exports (vision + text towers).
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`, as
//! produced by `optimum-cli export onnx --model openai/clip-vit-base-patch32`.
//! The graph takes `input_ids`, `attention_mask` and `pixel_values` and returns
//! `logits_per_image`, `text_embeds` and `image_embeds`.

use std::path::Path;

use aiwire_core::LabelProbabilities;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::AiError;
use crate::preprocess::{IMAGE_SIZE, PixelTensor, load_and_preprocess};
use crate::softmax::softmax_labeled;
use crate::zero_shot::{normalized, prompt_for};

/// CLIP text context length.
const MAX_TEXT_LEN: usize = 77;

/// Zero-shot image classifier backed by an ONNX CLIP model.
pub struct ClipModel {
    session: Session,
    tokenizer: Tokenizer,
}

/// Raw outputs of one forward pass.
struct ClipOutput {
    /// `[1, n_prompts]`, already scaled by `logit_scale`.
    logits_per_image: Vec<f32>,
    /// `[n_prompts, dim]`, flattened.
    text_embeds: Vec<f32>,
    /// `[1, dim]`.
    image_embeds: Vec<f32>,
    dim: usize,
}

impl ClipModel {
    /// Load a CLIP model from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TEXT_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            ..Default::default()
        }));

        info!(model = %model_path.display(), "loaded CLIP model");
        Ok(Self { session, tokenizer })
    }

    /// Classify an image file against candidate labels.
    ///
    /// Each label is embedded as `"a photo of a {label}"`; the model's
    /// `logits_per_image` row is normalized with softmax.
    pub fn classify(
        &mut self,
        image_path: &Path,
        labels: &[&str],
    ) -> anyhow::Result<LabelProbabilities> {
        if labels.is_empty() {
            return Err(AiError::InvalidInput("no candidate labels".into()).into());
        }
        let pixels = load_and_preprocess(image_path)?;
        let prompts: Vec<String> = labels.iter().map(|l| prompt_for(l)).collect();

        let out = self.run(&prompts, &pixels)?;
        anyhow::ensure!(
            out.logits_per_image.len() == labels.len(),
            "expected {} logits, got {}",
            labels.len(),
            out.logits_per_image.len()
        );

        let probs = softmax_labeled(labels.iter().copied(), &out.logits_per_image)?;
        if let Some(top) = probs.top() {
            info!(label = %top.label, probability = top.probability, "classified image");
        }
        Ok(probs)
    }

    /// L2-normalized image embedding.
    pub fn embed_image(&mut self, image_path: &Path) -> anyhow::Result<Vec<f32>> {
        let pixels = load_and_preprocess(image_path)?;
        let out = self.run(&[String::new()], &pixels)?;
        Ok(normalized(&out.image_embeds))
    }

    /// L2-normalized text embeddings, one per input.
    pub fn embed_text(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let side = IMAGE_SIZE as usize;
        let blank = PixelTensor {
            data: vec![0.0; 3 * side * side],
            shape: [1, 3, side, side],
        };
        let prompts: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let out = self.run(&prompts, &blank)?;

        Ok(out
            .text_embeds
            .chunks(out.dim)
            .map(normalized)
            .collect())
    }

    fn run(&mut self, prompts: &[String], pixels: &PixelTensor) -> anyhow::Result<ClipOutput> {
        let batch_size = prompts.len();
        let encodings = self
            .tokenizer
            .encode_batch(prompts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        // Flat [batch_size, seq_len] token tensors.
        let mut input_ids = vec![0i64; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let offset = i * seq_len;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[offset + j] = id as i64;
            }
            for (j, &mask) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[offset + j] = mask as i64;
            }
        }

        let text_shape = [batch_size as i64, seq_len as i64];
        let pixel_shape = pixels.shape.map(|d| d as i64);

        let ids_tensor = Tensor::from_array((text_shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((text_shape, attention_mask.into_boxed_slice()))?;
        let pixel_tensor =
            Tensor::from_array((pixel_shape, pixels.data.clone().into_boxed_slice()))?;

        debug!(batch_size, seq_len, "running CLIP inference");
        let outputs = self.session.run(ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "pixel_values" => pixel_tensor,
        ])?;

        let (_, logits) = outputs["logits_per_image"].try_extract_tensor::<f32>()?;
        let (text_shape, text_embeds) = outputs["text_embeds"].try_extract_tensor::<f32>()?;
        let (_, image_embeds) = outputs["image_embeds"].try_extract_tensor::<f32>()?;

        let dims: &[i64] = text_shape;
        anyhow::ensure!(
            dims.len() == 2 && dims[0] as usize == batch_size && dims[1] > 0,
            "unexpected text_embeds shape: {dims:?}, expected [{batch_size}, dim]"
        );

        Ok(ClipOutput {
            logits_per_image: logits.to_vec(),
            text_embeds: text_embeds.to_vec(),
            image_embeds: image_embeds.to_vec(),
            dim: dims[1] as usize,
        })
    }
}
