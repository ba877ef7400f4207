//! Offline rehearsal: builds a context from a recorded `release` event payload
//! instead of querying GitHub. Pull requests and issues are rarely present in
//! such payloads, so fixed examples stand in for them.

use serde::Deserialize;
use std::path::Path;

use super::{read_snapshot, read_spec_file, release_page_url, ContextError, ReleaseContext};

pub const DEFAULT_TAG: &str = "v1.0.0";
pub const DEFAULT_REPOSITORY: &str = "example-org/example-repo";

#[derive(Deserialize, Debug, Default)]
pub struct ReleaseEvent {
    #[serde(default)]
    pub release: Option<EventRelease>,
    #[serde(default)]
    pub repository: Option<EventRepository>,
    #[serde(default)]
    pub pull_requests: Option<Vec<EventItem>>,
    #[serde(default)]
    pub issues: Option<Vec<EventItem>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct EventRelease {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct EventRepository {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct EventItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl ReleaseEvent {
    pub fn parse(path: &Path, json: &str) -> Result<Self, ContextError> {
        serde_json::from_str(json).map_err(|source| ContextError::Snapshot {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn into_context(self, openapi_diff: Option<String>) -> ReleaseContext {
        let release = self.release.unwrap_or_default();
        let tag = nonempty(release.tag_name).unwrap_or_else(|| DEFAULT_TAG.to_string());
        let name = nonempty(release.name).unwrap_or_else(|| format!("Release {}", tag));
        let repo = self
            .repository
            .and_then(|r| nonempty(r.full_name))
            .unwrap_or_else(|| DEFAULT_REPOSITORY.to_string());
        let release_url = nonempty(release.html_url).unwrap_or_else(|| {
            release_page_url(&format!("https://github.com/{}", repo), &tag)
        });
        log::info!("snapshot release '{}' ({}) for {}", name, tag, repo);

        let pull_requests = self.pull_requests.unwrap_or_default();
        let mut pr_titles = pull_requests
            .iter()
            .enumerate()
            .map(|(i, pr)| {
                pr.title
                    .clone()
                    .unwrap_or_else(|| format!("Example PR {}", i + 1))
            })
            .collect::<Vec<_>>();
        let mut pr_descriptions = pull_requests
            .iter()
            .map(|pr| pr.body.clone().unwrap_or_default())
            .collect::<Vec<_>>();
        if pull_requests.is_empty() {
            pr_titles = vec!["Example PR 1".to_string(), "Example PR 2".to_string()];
            pr_descriptions = vec!["PR body 1".to_string(), "PR body 2".to_string()];
        }

        let mut issue_summaries = self
            .issues
            .unwrap_or_default()
            .into_iter()
            .map(|issue| issue.body.unwrap_or_default())
            .collect::<Vec<_>>();
        if issue_summaries.is_empty() {
            issue_summaries = vec!["Issue summary example".to_string()];
        }

        ReleaseContext {
            repo,
            release_tag: tag,
            release_notes: release.body.unwrap_or_default(),
            pr_titles,
            pr_descriptions,
            issue_summaries,
            openapi_diff,
            docs_urls: vec![release_url],
        }
    }
}

pub fn load_context(
    event_path: &Path,
    openapi_file: &Path,
) -> Result<ReleaseContext, ContextError> {
    let json = read_snapshot(event_path)?;
    let event = ReleaseEvent::parse(event_path, &json)?;
    let openapi_diff = read_spec_file(openapi_file)?;
    Ok(event.into_context(openapi_diff))
}

fn nonempty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
