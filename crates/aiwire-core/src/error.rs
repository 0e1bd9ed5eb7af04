use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    #[error("{labels} labels but {probabilities} probabilities")]
    LengthMismatch { labels: usize, probabilities: usize },

    #[error("probability for {label} must be finite and non-negative, got {probability}")]
    InvalidProbability { label: String, probability: f32 },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
