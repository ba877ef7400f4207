use anyhow::Context;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

use super::{read_spec_file, release_page_url, ContextError, ReleaseContext};

const PER_PAGE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("GitHub API error (status {status}) for {url}: {body}")]
    ApiStatus {
        status: u16,
        url: String,
        body: String,
    },
    #[error("Release not found: {0}")]
    ReleaseNotFound(String),
    #[error("Invalid GITHUB_TOKEN for Authorization header")]
    InvalidToken,
    #[error("Invalid GitHub API URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// `owner/name`
    pub repository: String,
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    base_url: Url,
    repository: String,
    client: Client,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Repository {
    pub full_name: String,
    pub html_url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct IssueEvent {
    pub event: String,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self, GithubError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GithubError::InvalidUrl(config.base_url.clone()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = config.token.as_deref() {
            let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| GithubError::InvalidToken)?;
            headers.insert(AUTHORIZATION, auth_value);
        } else {
            log::warn!("no GITHUB_TOKEN set, using unauthenticated GitHub API access");
        }

        let client = Client::builder()
            .default_headers(headers)
            .user_agent("releasepost/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            base_url,
            repository: config.repository,
            client,
        })
    }

    pub async fn repository(&self) -> Result<Repository, GithubError> {
        let url = self.endpoint(&[])?;
        self.get_json(url).await
    }

    /// Resolves `"latest"` to the most recent published release.
    pub async fn release(&self, tag: &str) -> Result<Release, GithubError> {
        let url = if tag == "latest" {
            self.endpoint(&["releases", "latest"])?
        } else {
            self.endpoint(&["releases", "tags", tag])?
        };
        match self.get_json(url).await {
            Err(GithubError::ApiStatus { status: 404, .. }) => {
                Err(GithubError::ReleaseNotFound(tag.to_string()))
            }
            other => other,
        }
    }

    /// Closed pull requests merged strictly after `since`, most recently updated first.
    pub async fn merged_pulls_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<PullRequest>, GithubError> {
        let mut merged = Vec::new();
        let mut page = 1;

        loop {
            let mut url = self.endpoint(&["pulls"])?;
            url.query_pairs_mut()
                .append_pair("state", "closed")
                .append_pair("sort", "updated")
                .append_pair("direction", "desc")
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let pulls: Vec<PullRequest> = self.get_json(url).await?;
            let count = pulls.len();

            for pr in pulls {
                // merged_at <= updated_at, so nothing further down can qualify
                if pr.updated_at < since {
                    return Ok(merged);
                }
                if pr.merged_at.is_some_and(|merged_at| merged_at > since) {
                    merged.push(pr);
                }
            }

            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(merged)
    }

    pub async fn issue_events(&self, number: u64) -> Result<Vec<IssueEvent>, GithubError> {
        let mut events = Vec::new();
        let mut page = 1;

        loop {
            let mut url = self.endpoint(&["issues", &number.to_string(), "events"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());
            let batch: Vec<IssueEvent> = self.get_json(url).await?;
            let count = batch.len();
            events.extend(batch);
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(events)
    }

    pub async fn fetch_release_context(
        &self,
        release_tag: &str,
        openapi_file: &Path,
    ) -> Result<ReleaseContext, ContextError> {
        log::info!("fetching repository {}...", self.repository);
        let repo = self.repository().await?;

        log::info!("resolving release '{}'...", release_tag);
        let release = self.release(release_tag).await?;
        log::info!(
            "using release {} (created {})",
            release.tag_name,
            release.created_at
        );

        let pulls = self.merged_pulls_since(release.created_at).await?;
        log::info!("found {} pull requests merged since the release", pulls.len());

        let mut pr_titles = Vec::new();
        let mut pr_descriptions = Vec::new();
        let mut issue_summaries = Vec::new();
        for pr in pulls {
            pr_titles.push(pr.title);
            if let Some(body) = pr.body.filter(|b| !b.is_empty()) {
                pr_descriptions.push(body);
            }
            let events = self.issue_events(pr.number).await?;
            log::debug!("pull request #{} has {} issue events", pr.number, events.len());
            issue_summaries.extend(events.into_iter().map(|e| e.event));
        }

        let openapi_diff = read_spec_file(openapi_file)?;

        Ok(ReleaseContext {
            docs_urls: vec![release_page_url(&repo.html_url, &release.tag_name)],
            repo: repo.full_name,
            release_tag: release.tag_name,
            release_notes: release.body.unwrap_or_default(),
            pr_titles,
            pr_descriptions,
            issue_summaries,
            openapi_diff,
        })
    }

    /// `{base}/repos/{owner}/{name}/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GithubError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GithubError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("repos")
            .extend(self.repository.split('/'))
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, GithubError> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context("GitHub API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::ApiStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        let parsed = response
            .json()
            .await
            .with_context(|| format!("Parsing GitHub API response from {}", url))?;
        Ok(parsed)
    }
}
