use async_trait::async_trait;
use chrono::NaiveDate;
use colloquy_core::{ColloquyError, ColloquyResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::debug;

// ---------------------------------------------------------------------------
// TranscriptLine
// ---------------------------------------------------------------------------

/// One transcript line: `[speaker]: content`.
///
/// Line breaks inside `content` are folded into single spaces so every
/// message occupies exactly one line of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    speaker: String,
    content: String,
}

impl TranscriptLine {
    /// Builds a line for `speaker`, folding line breaks in `content`.
    pub fn new(speaker: impl Into<String>, content: impl AsRef<str>) -> Self {
        Self {
            speaker: speaker.into(),
            content: fold_line_breaks(content.as_ref()),
        }
    }

    /// Speaker label.
    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    /// Single-line content.
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for TranscriptLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.speaker, self.content)
    }
}

fn fold_line_breaks(content: &str) -> String {
    if !content.contains(['\n', '\r']) {
        return content.to_string();
    }
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// TranscriptStore trait
// ---------------------------------------------------------------------------

/// Append-only transcript log keyed by calendar date.
///
/// Implementations assume a single writer.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Appends `line` to the transcript for `date`, creating it if needed.
    /// Returns only once the line has been flushed.
    async fn append(&self, date: NaiveDate, line: &TranscriptLine) -> ColloquyResult<()>;

    /// Reads back every line of the transcript for `date`.
    async fn read(&self, date: NaiveDate) -> ColloquyResult<Vec<String>>;

    /// Location of the transcript for `date`.
    fn path_for(&self, date: NaiveDate) -> PathBuf;
}

// ---------------------------------------------------------------------------
// FileTranscriptStore
// ---------------------------------------------------------------------------

/// Where transcripts live and how their files are named.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Directory holding one file per day.
    pub dir: PathBuf,
    /// File name prefix; the file for a day is `<prefix><YYYY-MM-DD>.txt`.
    pub prefix: String,
}

/// Plain-text transcripts on the local filesystem.
pub struct FileTranscriptStore {
    dir: PathBuf,
    prefix: String,
}

impl FileTranscriptStore {
    /// Opens the store, creating `config.dir` if needed.
    pub async fn new(config: TranscriptConfig) -> ColloquyResult<Self> {
        tokio::fs::create_dir_all(&config.dir).await?;
        Ok(Self {
            dir: config.dir,
            prefix: config.prefix,
        })
    }

    /// File name for `date`: `<prefix><YYYY-MM-DD>.txt`.
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}{}.txt", self.prefix, date.format("%Y-%m-%d"))
    }
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn append(&self, date: NaiveDate, line: &TranscriptLine) -> ColloquyResult<()> {
        let path = self.path_for(date);
        let write = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            let mut text = line.to_string();
            text.push('\n');
            file.write_all(text.as_bytes()).await?;
            file.flush().await
        };
        write.await.map_err(|e| {
            ColloquyError::Session(format!(
                "Failed to append to transcript {}: {e}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), speaker = line.speaker(), "Transcript line appended");
        Ok(())
    }

    async fn read(&self, date: NaiveDate) -> ColloquyResult<Vec<String>> {
        let path = self.path_for(date);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&path).await?;
        Ok(data.lines().map(str::to_string).collect())
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(self.file_name(date))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
