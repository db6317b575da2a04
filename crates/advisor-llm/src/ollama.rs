use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use advisor_core::config::GenerationSettings;
use advisor_core::traits::{Generator, Prompt};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Model returned an empty response")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Sampling options forwarded verbatim to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_predict: u32,
    pub repeat_penalty: f32,
    pub top_k: u32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    options: ChatOptions,
}

impl OllamaGenerator {
    pub fn new(settings: &GenerationSettings) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            options: ChatOptions {
                temperature: settings.temperature,
                num_predict: settings.max_tokens,
                repeat_penalty: settings.repeat_penalty,
                top_k: settings.top_k,
                top_p: settings.top_p,
            },
        })
    }

    pub fn build_request(&self, prompt: &Prompt) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system".to_string(), content: prompt.system.clone() },
                ChatMessage { role: "user".to_string(), content: prompt.user.clone() },
            ],
            stream: false,
            options: self.options.clone(),
        }
    }

    pub async fn chat(&self, prompt: &Prompt) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);
        let request = self.build_request(prompt);
        debug!("POST {} model={}", url, self.model);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), message });
        }
        let body = response.text().await.map_err(|e| LlmError::Network(e.to_string()))?;
        parse_response(&body)
    }
}

/// Extracts the assistant text from a non-streaming `/api/chat` body.
pub fn parse_response(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    if parsed.message.content.trim().is_empty() { return Err(LlmError::EmptyResponse); }
    Ok(parsed.message.content)
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &Prompt) -> anyhow::Result<String> {
        Ok(self.chat(prompt).await?)
    }
}
