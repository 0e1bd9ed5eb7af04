//! OpenAI-style text completions (`POST /completions`).
//!
//! Works against OpenAI itself and any server that speaks the same legacy
//! completions format (set `OPENAI_BASE_URL`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConnectorError, ConnectorResult};
use crate::http::{build_client, post_json, trim_base};
use crate::traits::{Generation, TextGenerator, TokenUsage};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Completions client configuration.
#[derive(Debug, Clone)]
pub struct CompletionsConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl CompletionsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            timeout_secs: 30,
        }
    }

    /// Read `OPENAI_API_KEY`, plus optional `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
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

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: String,
    choices: Vec<CompletionChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
    finish_reason: Option<String>,
}

/// Client for the completions endpoint.
pub struct CompletionsClient {
    client: reqwest::Client,
    config: CompletionsConfig,
}

impl CompletionsClient {
    pub fn new(config: CompletionsConfig) -> ConnectorResult<Self> {
        if config.api_key.is_empty() {
            return Err(ConnectorError::Config("OpenAI API key is empty".into()));
        }
        let client = build_client(config.timeout_secs)?;
        let config = CompletionsConfig {
            base_url: trim_base(&config.base_url),
            ..config
        };
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/completions", self.config.base_url)
    }

    fn request<'a>(&'a self, prompt: &'a str, max_tokens: Option<u32>) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.config.model,
            prompt,
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.config.temperature,
        }
    }

    /// Complete `prompt`, returning the first choice.
    pub async fn complete(&self, prompt: &str, max_tokens: Option<u32>) -> ConnectorResult<Generation> {
        let body = self.request(prompt, max_tokens);
        let resp: CompletionResponse = post_json(&self.client, &self.url(), &self.config.api_key, &body).await?;
        let generation = into_generation(resp)?;
        info!(
            model = %generation.model,
            chars = generation.text.len(),
            finish_reason = ?generation.finish_reason,
            "completion received"
        );
        Ok(generation)
    }
}

fn into_generation(resp: CompletionResponse) -> ConnectorResult<Generation> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ConnectorError::InvalidResponse("no choices in response".into()))?;
    Ok(Generation {
        text: choice.text,
        model: resp.model,
        finish_reason: choice.finish_reason,
        usage: resp.usage,
    })
}

#[async_trait]
impl TextGenerator for CompletionsClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str, max_tokens: Option<u32>) -> ConnectorResult<Generation> {
        self.complete(prompt, max_tokens).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "id": "cmpl-uqkvlQyYK7bGYrRHQ0eXlWi7",
        "object": "text_completion",
        "created": 1589478378,
        "model": "gpt-3.5-turbo-instruct",
        "choices": [
            {
                "text": "\n\nThis is indeed a test",
                "index": 0,
                "logprobs": null,
                "finish_reason": "length"
            }
        ],
        "usage": { "prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12 }
    }"#;

    fn client() -> CompletionsClient {
        CompletionsClient::new(CompletionsConfig::new("sk-test").with_base_url("http://localhost:8080/v1/"))
            .unwrap()
    }

    #[test]
    fn request_body_shape() {
        let c = client();
        let json = serde_json::to_value(c.request("Say this is a test", Some(7))).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["prompt"], "Say this is a test");
        assert_eq!(json["max_tokens"], 7);
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn default_max_tokens_and_temperature() {
        let c = CompletionsClient::new(CompletionsConfig::new("sk-test").with_temperature(0.2)).unwrap();
        let json = serde_json::to_value(c.request("hi", None)).unwrap();
        assert_eq!(json["max_tokens"], DEFAULT_MAX_TOKENS);
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn url_has_no_double_slash() {
        assert_eq!(client().url(), "http://localhost:8080/v1/completions");
    }

    #[test]
    fn parses_first_choice() {
        let resp: CompletionResponse = serde_json::from_str(RESPONSE).unwrap();
        let generation = into_generation(resp).unwrap();
        assert_eq!(generation.text, "\n\nThis is indeed a test");
        assert_eq!(generation.finish_reason.as_deref(), Some("length"));
        assert_eq!(generation.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn empty_choices_is_invalid() {
        let resp: CompletionResponse =
            serde_json::from_str(r#"{"model":"m","choices":[]}"#).unwrap();
        assert!(matches!(
            into_generation(resp),
            Err(ConnectorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn empty_key_is_config_error() {
        assert!(matches!(
            CompletionsClient::new(CompletionsConfig::new("")),
            Err(ConnectorError::Config(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_http_error() {
        let c = CompletionsClient::new(
            CompletionsConfig::new("sk-test").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        assert!(matches!(
            c.generate("hello", Some(5)).await,
            Err(ConnectorError::Http(_))
        ));
    }
}
