use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Core(#[from] aiwire_core::CoreError),
}
