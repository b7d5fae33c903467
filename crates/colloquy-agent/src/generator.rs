use crate::backends::LlmBackend;
use crate::config::GenerationConfig;
use crate::context::ContextWindow;
use colloquy_core::{ColloquyError, Message};
use std::time::Duration;
use tracing::{error, info, warn};

/// Why a single backend call produced no reply.
#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    /// The call did not finish before its deadline and was dropped.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    /// The backend answered with an error or an unusable body.
    #[error("generation failed: {0}")]
    Backend(#[source] ColloquyError),
}

impl GenerationFailure {
    /// Short label used in log records.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationFailure::Timeout(_) => "timeout",
            GenerationFailure::Backend(_) => "backend",
        }
    }
}

/// How a [`Reply`] came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Text produced by the backend.
    Genuine,
    /// The backend answered, but too briefly; the filler text stands in.
    Filler,
    /// Every attempt failed; the fallback text stands in.
    Fallback,
}

/// Displayable result of [`ResponseGenerator::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Text to record and display.
    pub text: String,
    /// Whether the text came from the backend.
    pub kind: ReplyKind,
    /// Backend calls made to obtain this reply.
    pub attempts: u32,
}

/// Wraps one backend with a context window, a hard deadline per call,
/// bounded retries and a minimum-length quality gate.
///
/// `generate` never fails: backend errors and timeouts are absorbed and
/// turned into the configured fallback text once attempts run out.
pub struct ResponseGenerator {
    backend: Box<dyn LlmBackend>,
    config: GenerationConfig,
    window: ContextWindow,
}

impl ResponseGenerator {
    /// Wraps `backend` with the limits in `config`.
    pub fn new(backend: Box<dyn LlmBackend>, config: GenerationConfig) -> Self {
        let window = ContextWindow::new(config.window);
        Self {
            backend,
            config,
            window,
        }
    }

    /// Limits in effect.
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Produces a reply for `model_id` from the tail of `history`.
    ///
    /// Makes at most `max_retries` backend calls.
    pub async fn generate(&self, model_id: &str, history: &[Message]) -> Reply {
        let messages = self.window.view(history);
        let max_attempts = self.config.max_retries;

        for attempt in 1..=max_attempts {
            match self.attempt(model_id, messages).await {
                Ok(raw) => {
                    let text = raw.trim();
                    if text.chars().count() < self.config.min_acceptable_length {
                        warn!(
                            model = %model_id,
                            attempt,
                            length = text.chars().count(),
                            min = self.config.min_acceptable_length,
                            "Reply below minimum length, substituting filler"
                        );
                        return Reply {
                            text: self.config.filler_text.clone(),
                            kind: ReplyKind::Filler,
                            attempts: attempt,
                        };
                    }
                    info!(
                        model = %model_id,
                        attempt,
                        sent = messages.len(),
                        approx_tokens = self.window.estimated_tokens(history),
                        "Generation succeeded"
                    );
                    return Reply {
                        text: text.to_string(),
                        kind: ReplyKind::Genuine,
                        attempts: attempt,
                    };
                }
                Err(failure) => {
                    warn!(
                        model = %model_id,
                        attempt,
                        max_attempts,
                        kind = failure.kind(),
                        error = %failure,
                        "Generation attempt failed"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.backoff()).await;
                    }
                }
            }
        }

        error!(
            model = %model_id,
            attempts = max_attempts,
            "Generation attempts exhausted, returning fallback"
        );
        Reply {
            text: self.config.fallback_text.clone(),
            kind: ReplyKind::Fallback,
            attempts: max_attempts,
        }
    }

    /// One backend call under the configured deadline. Expiry drops the
    /// in-flight request future.
    async fn attempt(
        &self,
        model_id: &str,
        messages: &[Message],
    ) -> Result<String, GenerationFailure> {
        let deadline = self.config.timeout();
        match tokio::time::timeout(deadline, self.backend.chat(model_id, messages)).await {
            Err(_elapsed) => Err(GenerationFailure::Timeout(deadline)),
            Ok(Err(e)) => Err(GenerationFailure::Backend(e)),
            Ok(Ok(text)) => Ok(text),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
