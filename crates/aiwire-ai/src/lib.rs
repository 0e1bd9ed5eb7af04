//! AI inference layer: softmax normalization, zero-shot scoring, CLIP preprocessing,
//! and ONNX Runtime inference for CLIP models.

mod error;
pub mod preprocess;
pub mod softmax;
pub mod zero_shot;

pub use error::AiError;
pub use preprocess::{PixelTensor, load_and_preprocess, preprocess_image};
pub use softmax::{softmax, softmax_labeled};
pub use zero_shot::ZeroShotScorer;

#[cfg(feature = "onnx")]
mod clip;
#[cfg(feature = "onnx")]
pub use clip::ClipModel;
