pub mod github;
pub mod snapshot;

use anyhow::Context;
use std::fs;
use std::path::Path;

use crate::config::{AppConfig, Mode, DEFAULT_GITHUB_API_URL};
use github::{GithubClient, GithubConfig, GithubError};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("ACT is true but GITHUB_EVENT_PATH is missing or invalid")]
    MissingEventPath,
    #[error("GITHUB_REPOSITORY must be set to owner/name when not running in offline mode")]
    MissingRepository,
    #[error("Invalid event snapshot {path}: {source}")]
    Snapshot {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Reading specification file {path}: {source}")]
    SpecFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Github(#[from] GithubError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything known about a release, gathered once before prompting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseContext {
    pub repo: String,
    pub release_tag: String,
    pub release_notes: String,
    pub pr_titles: Vec<String>,
    pub pr_descriptions: Vec<String>,
    pub issue_summaries: Vec<String>,
    /// Raw contents of the specification file, not a computed delta.
    pub openapi_diff: Option<String>,
    pub docs_urls: Vec<String>,
}

pub async fn build_context(config: &AppConfig) -> Result<ReleaseContext, ContextError> {
    match config.mode() {
        Mode::Offline => {
            let event_path = config
                .event_path
                .as_deref()
                .filter(|path| Path::new(path).exists())
                .ok_or(ContextError::MissingEventPath)?;
            log::info!("offline mode: reading release event from {}", event_path);
            snapshot::load_context(Path::new(event_path), Path::new(&config.openapi_file))
        }
        Mode::Live => {
            let repository = config
                .repository
                .clone()
                .ok_or(ContextError::MissingRepository)?;
            let base_url = Some(config.github_api_url.trim())
                .filter(|url| !url.is_empty())
                .unwrap_or(DEFAULT_GITHUB_API_URL)
                .to_string();
            let client = GithubClient::new(GithubConfig {
                base_url,
                token: config.github_token.clone(),
                repository,
            })?;
            client
                .fetch_release_context(&config.release_tag, Path::new(&config.openapi_file))
                .await
        }
    }
}

/// Returns the file contents when it exists, `None` otherwise.
pub fn read_spec_file(path: &Path) -> Result<Option<String>, ContextError> {
    if path.as_os_str().is_empty() || !path.exists() {
        log::debug!("no specification file at {}", path.display());
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|source| ContextError::SpecFile {
        path: path.display().to_string(),
        source,
    })?;
    log::info!(
        "attaching specification file {} ({} bytes)",
        path.display(),
        contents.len()
    );
    Ok(Some(contents))
}

pub(crate) fn release_page_url(repo_html_url: &str, tag: &str) -> String {
    format!("{}/releases/tag/{}", repo_html_url.trim_end_matches('/'), tag)
}

pub(crate) fn read_snapshot(path: &Path) -> Result<String, ContextError> {
    fs::read_to_string(path)
        .with_context(|| format!("Reading event snapshot {}", path.display()))
        .map_err(ContextError::from)
}
