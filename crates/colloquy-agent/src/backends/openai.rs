use super::LlmBackend;
use crate::config::BackendConfig;
use async_trait::async_trait;
use colloquy_core::{ColloquyError, ColloquyResult, Message};

/// OpenAI-compatible API backend.
///
/// Works with OpenAI, OpenRouter, Groq, vLLM, llama.cpp server and any other
/// provider that implements the chat completions API.
pub struct OpenAiBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl OpenAiBackend {
    /// Backend talking to `config.base_url()`.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn build_messages(&self, messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": m.role().as_str(),
                    "content": m.content(),
                })
            })
            .collect()
    }

    fn add_auth_header(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {key}")),
            None => request,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn chat(&self, model_id: &str, messages: &[Message]) -> ColloquyResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let body = serde_json::json!({
            "model": model_id,
            "messages": self.build_messages(messages),
        });

        let resp = self
            .add_auth_header(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ColloquyError::Http(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ColloquyError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(ColloquyError::Http(format!(
                "OpenAI API error {status}: {resp_body}"
            )));
        }

        parse_openai_response(&resp_body)
    }
}

/// Extracts `choices[0].message.content` from a chat completions body.
pub fn parse_openai_response(body: &serde_json::Value) -> ColloquyResult<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ColloquyError::Agent(format!("Malformed chat completions response: {body}"))
        })
}
