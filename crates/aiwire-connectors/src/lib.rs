//! Vendor connectors: thin HTTP clients over third-party AI endpoints.
//!
//! Every client translates non-2xx responses through one place
//! ([`error::check_status`]) so callers can branch on
//! [`ConnectorError::Unauthorized`] and [`ConnectorError::RateLimited`].

pub mod azure_speech;
pub mod azure_vision;
pub mod error;
pub mod grok;
mod http;
pub mod openai;
pub mod traits;

pub use azure_speech::{Recognition, SpeechClient, SpeechConfig};
pub use azure_vision::{Face, FaceRectangle, VisionClient, VisionConfig};
pub use error::{ConnectorError, ConnectorResult};
pub use grok::{GrokClient, GrokConfig};
pub use openai::{CompletionsClient, CompletionsConfig};
pub use traits::{Generation, TextGenerator, TokenUsage};
