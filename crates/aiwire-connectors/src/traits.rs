//! Provider-neutral text generation interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ConnectorResult;

/// Text produced by a generation call.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub model: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// Token accounting reported by OpenAI-compatible APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A vendor that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short provider name, for logs.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`. `None` uses the client's default token limit.
    async fn generate(&self, prompt: &str, max_tokens: Option<u32>) -> ConnectorResult<Generation>;
}
