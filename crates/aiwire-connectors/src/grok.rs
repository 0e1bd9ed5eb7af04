//! xAI Grok chat completions (OpenAI-compatible `POST /chat/completions`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConnectorError, ConnectorResult};
use crate::http::{build_client, post_json, trim_base};
use crate::traits::{Generation, TextGenerator, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
pub const DEFAULT_MODEL: &str = "grok-beta";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Grok client configuration.
#[derive(Debug, Clone)]
pub struct GrokConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Optional system message sent before every prompt.
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl GrokConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            temperature: None,
            timeout_secs: 60,
        }
    }

    /// Read `XAI_API_KEY`, plus optional `XAI_BASE_URL` and `XAI_MODEL`.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("XAI_API_KEY").ok()?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("XAI_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("XAI_MODEL") {
            config.model = model;
        }
        Some(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

/// Client for xAI's chat completions endpoint.
pub struct GrokClient {
    client: reqwest::Client,
    config: GrokConfig,
}

impl GrokClient {
    pub fn new(config: GrokConfig) -> ConnectorResult<Self> {
        if config.api_key.is_empty() {
            return Err(ConnectorError::Config("xAI API key is empty".into()));
        }
        let client = build_client(config.timeout_secs)?;
        let config = GrokConfig {
            base_url: trim_base(&config.base_url),
            ..config
        };
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn request(&self, prompt: &str, max_tokens: Option<u32>) -> ChatRequest<'_> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.config.system_prompt {
            messages.push(ChatMessage {
                role: "system".into(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".into(),
            content: prompt.to_string(),
        });

        ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.config.temperature,
            stream: false,
        }
    }

    /// Send one user prompt and return the assistant's reply.
    pub async fn chat(&self, prompt: &str, max_tokens: Option<u32>) -> ConnectorResult<Generation> {
        let body = self.request(prompt, max_tokens);
        let resp: ChatResponse = post_json(&self.client, &self.url(), &self.config.api_key, &body).await?;
        let generation = into_generation(resp)?;
        info!(
            model = %generation.model,
            chars = generation.text.len(),
            "grok reply received"
        );
        Ok(generation)
    }
}

fn into_generation(resp: ChatResponse) -> ConnectorResult<Generation> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ConnectorError::InvalidResponse("no choices in response".into()))?;
    Ok(Generation {
        text: choice.message.content,
        model: resp.model,
        finish_reason: choice.finish_reason,
        usage: resp.usage,
    })
}

#[async_trait]
impl TextGenerator for GrokClient {
    fn name(&self) -> &str {
        "grok"
    }

    async fn generate(&self, prompt: &str, max_tokens: Option<u32>) -> ConnectorResult<Generation> {
        self.chat(prompt, max_tokens).await
    }
}
