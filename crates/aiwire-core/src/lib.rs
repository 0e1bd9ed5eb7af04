mod error;
pub mod probabilities;
pub mod schema;

pub use error::CoreError;
pub use probabilities::LabelProbabilities;
