//! GitHub contents API archive.

use crate::{ArchiveClient, ArchiveOutcome, SkipReason};
use async_trait::async_trait;
use base64::Engine;
use colloquy_core::{ColloquyError, ColloquyResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Repository coordinates and credential for [`GitHubArchive`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Target branch; the repository default when absent.
    #[serde(default)]
    pub branch: Option<String>,
    /// Directory inside the repository, e.g. `transcripts`.
    #[serde(default)]
    pub path_prefix: Option<String>,
    /// API root; `https://api.github.com` when absent.
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Personal access token. Uploads are skipped when absent.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Stores transcripts as files in a GitHub repository.
pub struct GitHubArchive {
    client: reqwest::Client,
    base_url: String,
    config: ArchiveConfig,
}

impl GitHubArchive {
    /// Builds the HTTP client with GitHub headers and a 30 s timeout.
    pub fn new(config: ArchiveConfig) -> ColloquyResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ColloquyError::Config(format!("Invalid archive token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("colloquy-archive"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ColloquyError::Archive(format!("Failed to build HTTP client: {e}")))?;

        let base_url = config
            .api_base_url
            .as_deref()
            .unwrap_or("https://api.github.com")
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Path of `file_name` inside the repository.
    pub fn remote_path(&self, file_name: &str) -> String {
        match self.config.path_prefix.as_deref().map(|p| p.trim_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}/{file_name}"),
            _ => file_name.to_string(),
        }
    }

    fn contents_url(&self, remote_path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url, self.config.owner, self.config.repo, remote_path
        )
    }

    /// Blob sha of the remote file, or `None` when it does not exist yet.
    async fn existing_sha(&self, remote_path: &str) -> ColloquyResult<Option<String>> {
        let mut request = self.client.get(self.contents_url(remote_path));
        if let Some(branch) = &self.config.branch {
            request = request.query(&[("ref", branch)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ColloquyError::Http(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let entry: ContentsEntry = response.json().await.map_err(|e| {
                    ColloquyError::Archive(format!("Failed to parse contents response: {e}"))
                })?;
                Ok(Some(entry.sha))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ColloquyError::Archive(format!(
                    "GitHub API error {status}: {body}"
                )))
            }
        }
    }
}

#[async_trait]
impl ArchiveClient for GitHubArchive {
    async fn upload(&self, file_path: &Path, commit_message: &str) -> ColloquyResult<ArchiveOutcome> {
        if self.config.token.is_none() {
            warn!(path = %file_path.display(), "Archive token not configured, skipping upload");
            return Ok(ArchiveOutcome::Skipped(SkipReason::NoCredential));
        }

        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ColloquyError::Archive(format!("Not a file path: {}", file_path.display()))
            })?;
        let remote_path = self.remote_path(file_name);

        let bytes = tokio::fs::read(file_path).await?;
        let sha = self.existing_sha(&remote_path).await?;
        let updating = sha.is_some();

        let body = PutContentsRequest {
            message: commit_message,
            content: base64::engine::general_purpose::STANDARD.encode(bytes),
            sha,
            branch: self.config.branch.as_deref(),
        };

        let response = self
            .client
            .put(self.contents_url(&remote_path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ColloquyError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ColloquyError::Archive(format!(
                "GitHub API error {status}: {body}"
            )));
        }

        let outcome = if updating {
            ArchiveOutcome::Updated
        } else {
            ArchiveOutcome::Created
        };
        info!(
            remote = %remote_path,
            repo = %format!("{}/{}", self.config.owner, self.config.repo),
            ?outcome,
            "Transcript archived"
        );
        Ok(outcome)
    }
}
