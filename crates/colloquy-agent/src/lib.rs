//! Talking to generation backends.
//!
//! [`ResponseGenerator`] wraps a single [`LlmBackend`] with a context
//! window, a hard per-call deadline, bounded retries and a quality gate, so
//! that callers always get displayable text back.

pub mod backends;
pub mod config;
pub mod context;
pub mod generator;

pub use backends::{build_backend, LlmBackend};
pub use config::{BackendConfig, GenerationConfig, LlmProvider};
pub use context::ContextWindow;
pub use generator::{GenerationFailure, Reply, ReplyKind, ResponseGenerator};
