use crate::engine::ConversationConfig;
use crate::rollover::RolloverConfig;
use colloquy_agent::{BackendConfig, GenerationConfig};
use colloquy_archive::ArchiveConfig;
use colloquy_core::{ColloquyError, ColloquyResult};
use colloquy_session::TranscriptConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, one TOML table per collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColloquyConfig {
    /// Generation backend.
    pub backend: BackendConfig,
    /// Timeout, retry and quality limits.
    pub generation: GenerationConfig,
    /// Speakers, topology and pacing.
    pub conversation: ConversationConfig,
    /// Where transcripts are written.
    pub transcript: TranscriptConfig,
    /// Daily boundary handling.
    pub rollover: RolloverConfig,
    /// Remote archive; transcripts stay local when absent.
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,
}

impl ColloquyConfig {
    /// Parses TOML text; syntax and shape errors become [`ColloquyError::Config`].
    pub fn from_toml_str(text: &str) -> ColloquyResult<Self> {
        toml::from_str(text).map_err(|e| ColloquyError::Config(format!("Invalid config: {e}")))
    }

    /// Reads and parses the file at `path`.
    pub async fn load(path: &Path) -> ColloquyResult<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            ColloquyError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates every section.
    pub fn validate(&self) -> ColloquyResult<()> {
        self.generation.validate()?;
        self.conversation.validate()?;
        self.rollover.validate()?;
        if self.transcript.prefix.contains(['/', '\\']) {
            return Err(ColloquyError::Config(
                "transcript.prefix must not contain path separators".into(),
            ));
        }
        if let Some(archive) = &self.archive {
            if archive.owner.trim().is_empty() || archive.repo.trim().is_empty() {
                return Err(ColloquyError::Config(
                    "archive.owner and archive.repo must not be empty".into(),
                ));
            }
        }
        Ok(())
    }
}
