use thiserror::Error;

/// A convenience `Result` alias using [`ColloquyError`].
pub type ColloquyResult<T> = Result<T, ColloquyError>;

/// Top-level error type for Colloquy.
///
/// Each variant corresponds to a subsystem that can produce errors.
#[derive(Error, Debug)]
pub enum ColloquyError {
    /// A backend returned something that could not be used as a reply.
    #[error("Agent error: {0}")]
    Agent(String),

    /// An outbound HTTP request failed (generation backend or archive).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Transcript persistence failed.
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration could not be parsed or failed validation.
    #[error("Config error: {0}")]
    Config(String),

    /// The archival store rejected an upload.
    #[error("Archive error: {0}")]
    Archive(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
