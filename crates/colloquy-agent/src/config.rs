use colloquy_core::{ColloquyError, ColloquyResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reply substituted when a genuine reply is too short to be useful.
pub const DEFAULT_FILLER_TEXT: &str = "I need more time to think about this.";

/// Reply returned when every attempt failed.
pub const DEFAULT_FALLBACK_TEXT: &str = "I'm having trouble responding right now.";

/// Supported backend wire protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// A local or remote Ollama server (`/api/chat`).
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint.
    OpenAi,
}

/// Which backend to talk to and where it lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Wire protocol to speak.
    pub provider: LlmProvider,
    /// Server root; the provider default when absent.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Bearer token, if the backend wants one. Never written back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl BackendConfig {
    /// Configured base URL without a trailing slash, or the provider default.
    pub fn base_url(&self) -> &str {
        if let Some(url) = &self.api_base_url {
            url.trim_end_matches('/')
        } else {
            match self.provider {
                LlmProvider::Ollama => "http://localhost:11434",
                LlmProvider::OpenAi => "https://api.openai.com",
            }
        }
    }
}

/// Limits applied to every generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Hard deadline for a single backend call.
    pub timeout_ms: u64,
    /// Total number of backend calls allowed per reply.
    pub max_retries: u32,
    /// Pause between a failed attempt and the next one.
    pub backoff_ms: u64,
    /// Trimmed replies shorter than this (in chars) are replaced by `filler_text`.
    pub min_acceptable_length: usize,
    /// Number of most recent messages sent to the backend.
    pub window: usize,
    /// Stands in for replies below `min_acceptable_length`.
    #[serde(default = "default_filler_text")]
    pub filler_text: String,
    /// Returned when every attempt fails.
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,
}

fn default_filler_text() -> String {
    DEFAULT_FILLER_TEXT.to_string()
}

fn default_fallback_text() -> String {
    DEFAULT_FALLBACK_TEXT.to_string()
}

impl GenerationConfig {
    /// `timeout_ms` as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `backoff_ms` as a [`Duration`].
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Rejects zero limits and empty placeholder texts.
    pub fn validate(&self) -> ColloquyResult<()> {
        if self.timeout_ms == 0 {
            return Err(ColloquyError::Config(
                "generation.timeout_ms must be greater than 0".into(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ColloquyError::Config(
                "generation.max_retries must be at least 1".into(),
            ));
        }
        if self.window == 0 {
            return Err(ColloquyError::Config(
                "generation.window must be at least 1".into(),
            ));
        }
        if self.filler_text.trim().is_empty() || self.fallback_text.trim().is_empty() {
            return Err(ColloquyError::Config(
                "generation.filler_text and generation.fallback_text must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn generation() -> GenerationConfig {
        GenerationConfig {
            timeout_ms: 30_000,
            max_retries: 3,
            backoff_ms: 3_000,
            min_acceptable_length: 10,
            window: 10,
            filler_text: default_filler_text(),
            fallback_text: default_fallback_text(),
        }
    }

    #[test]
    fn base_url_defaults_per_provider() {
        let ollama = BackendConfig {
            provider: LlmProvider::Ollama,
            api_base_url: None,
            api_key: None,
        };
        assert_eq!(ollama.base_url(), "http://localhost:11434");

        let openai = BackendConfig {
            provider: LlmProvider::OpenAi,
            api_base_url: Some("http://127.0.0.1:8080/".into()),
            api_key: None,
        };
        assert_eq!(openai.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn validate_rejects_zero_limits() {
        assert!(generation().validate().is_ok());

        let mut cfg = generation();
        cfg.max_retries = 0;
        assert!(matches!(cfg.validate(), Err(ColloquyError::Config(_))));

        let mut cfg = generation();
        cfg.window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = generation();
        cfg.timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn durations_are_milliseconds() {
        let cfg = generation();
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.backoff(), Duration::from_secs(3));
    }
}
