//! Ollama backend (`POST /api/chat`, non-streaming).

use super::LlmBackend;
use crate::config::BackendConfig;
use async_trait::async_trait;
use colloquy_core::{ColloquyError, ColloquyResult, Message};
use serde::{Deserialize, Serialize};

/// Ollama chat backend.
pub struct OllamaBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

impl OllamaBackend {
    /// Backend talking to `config.base_url()`.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn chat(&self, model_id: &str, messages: &[Message]) -> ColloquyResult<String> {
        let url = format!("{}/api/chat", self.config.base_url());
        let body = OllamaChatRequest {
            model: model_id,
            messages: messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role().as_str(),
                    content: m.content(),
                })
                .collect(),
            stream: false,
        };

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ColloquyError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ColloquyError::Http(format!(
                "Ollama API error {status}: {error_body}"
            )));
        }

        let parsed: OllamaChatResponse = resp
            .json()
            .await
            .map_err(|e| ColloquyError::Agent(format!("Malformed Ollama response: {e}")))?;
        Ok(parsed.message.content)
    }
}
