pub mod ollama;
pub mod openai;

use crate::config::{BackendConfig, LlmProvider};
use async_trait::async_trait;
use colloquy_core::{ColloquyResult, Message};

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

/// Trait for generation backends.
///
/// A backend takes a model identifier and an ordered list of messages and
/// returns the raw reply text. Deadlines, retries and quality checks are the
/// caller's job (see [`ResponseGenerator`](crate::ResponseGenerator)).
///
/// To add a new provider:
/// 1. Create a new module in `backends/`
/// 2. Implement `LlmBackend` for your struct
/// 3. Add the variant to `LlmProvider` in `config.rs`
/// 4. Wire it up in [`build_backend`]
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Sends `messages` to `model_id` and returns the raw reply text.
    async fn chat(&self, model_id: &str, messages: &[Message]) -> ColloquyResult<String>;
}

/// Builds the backend selected by `config.provider`.
pub fn build_backend(config: &BackendConfig) -> Box<dyn LlmBackend> {
    match config.provider {
        LlmProvider::Ollama => Box::new(OllamaBackend::new(config.clone())),
        LlmProvider::OpenAi => Box::new(OpenAiBackend::new(config.clone())),
    }
}
