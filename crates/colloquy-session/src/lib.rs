//! Conversation state and durable transcripts.
//!
//! - [`History`]: ordered, append-only list of [`Message`](colloquy_core::Message)s.
//! - [`TranscriptStore`]: append-only daily log, one file per calendar date.

pub mod history;
pub mod transcript;

pub use history::History;
pub use transcript::{FileTranscriptStore, TranscriptConfig, TranscriptLine, TranscriptStore};
