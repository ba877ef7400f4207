use clap::{Parser, ValueEnum};
use serde::{Deserialize, Deserializer};
use std::fmt;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
}

/// Layout conventions the generated post has to follow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputStyle {
    #[default]
    Markdown,
    Jekyll,
    Mkdocs,
}

impl OutputStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStyle::Markdown => "markdown",
            OutputStyle::Jekyll => "jekyll",
            OutputStyle::Mkdocs => "mkdocs",
        }
    }

    /// Unknown or blank values fall back to markdown.
    pub fn from_name(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "jekyll" => OutputStyle::Jekyll,
            "mkdocs" => OutputStyle::Mkdocs,
            "markdown" | "" => OutputStyle::Markdown,
            other => {
                log::warn!("unknown output format '{}', using markdown", other);
                OutputStyle::Markdown
            }
        }
    }
}

impl fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Recorded event snapshot plus a local model.
    Offline,
    /// GitHub API plus the hosted model.
    Live,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.is_some_and(|v| v.trim().eq_ignore_ascii_case("true")))
}

fn deserialize_output_style<'de, D>(deserializer: D) -> Result<OutputStyle, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|v| OutputStyle::from_name(&v)).unwrap_or_default())
}

fn deserialize_nonblank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|v| !v.trim().is_empty()))
}

fn deserialize_release_tag<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_nonblank(deserializer)?.unwrap_or_else(default_release_tag))
}

fn deserialize_openapi_file<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_nonblank(deserializer)?.unwrap_or_else(default_openapi_file))
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default, deserialize_with = "deserialize_nonblank")]
    pub github_token: Option<String>,
    #[serde(
        default = "default_release_tag",
        deserialize_with = "deserialize_release_tag"
    )]
    pub release_tag: String,
    #[serde(
        default = "default_openapi_file",
        deserialize_with = "deserialize_openapi_file"
    )]
    pub openapi_file: String,
    #[serde(default)]
    pub llm_model: String,
    #[serde(default, deserialize_with = "deserialize_nonblank")]
    pub openai_api_key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_nonblank")]
    pub llm_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_output_style")]
    pub output_format: OutputStyle,

    #[serde(rename = "act", default, deserialize_with = "deserialize_flag")]
    pub offline: bool,
    #[serde(
        rename = "github_event_path",
        default,
        deserialize_with = "deserialize_nonblank"
    )]
    pub event_path: Option<String>,
    #[serde(
        rename = "github_repository",
        default,
        deserialize_with = "deserialize_nonblank"
    )]
    pub repository: Option<String>,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::from_env::<AppConfig>()?)
    }

    pub fn with_overrides(mut self, cli: Cli) -> Self {
        if let Some(token) = cli.github_token {
            self.github_token = Some(token);
        }
        if let Some(tag) = cli.release_tag {
            self.release_tag = tag;
        }
        if let Some(file) = cli.openapi_file {
            self.openapi_file = file;
        }
        if let Some(model) = cli.llm_model {
            self.llm_model = model;
        }
        if let Some(key) = cli.openai_api_key {
            self.openai_api_key = Some(key);
        }
        if let Some(url) = cli.llm_url {
            self.llm_url = Some(url);
        }
        if let Some(style) = cli.output_format {
            self.output_format = style;
        }
        if let Some(repository) = cli.repository {
            self.repository = Some(repository);
        }
        self
    }

    pub fn mode(&self) -> Mode {
        if self.offline {
            Mode::Offline
        } else {
            Mode::Live
        }
    }
}

/// Command line overrides. Anything left unset keeps the environment value.
#[derive(Parser, Debug, Default)]
#[command(
    name = "releasepost",
    version,
    about = "Generate a release announcement blog post with an LLM"
)]
pub struct Cli {
    /// Token for the GitHub API
    #[arg(long, alias = "github_token")]
    pub github_token: Option<String>,
    /// Release to describe; "latest" resolves to the most recent release
    #[arg(long, alias = "release_tag")]
    pub release_tag: Option<String>,
    /// API specification attached verbatim to the prompt when present
    #[arg(long, alias = "openapi_file")]
    pub openapi_file: Option<String>,
    /// Model name passed to the generation backend
    #[arg(long, alias = "llm_model")]
    pub llm_model: Option<String>,
    /// API key for the hosted model
    #[arg(long, alias = "openai_api_key")]
    pub openai_api_key: Option<String>,
    /// Base URL of the local model (offline mode only)
    #[arg(long, alias = "llm_url")]
    pub llm_url: Option<String>,
    /// Output style of the generated post
    #[arg(long, alias = "output_format", value_enum)]
    pub output_format: Option<OutputStyle>,
    /// Repository in owner/name form
    #[arg(long)]
    pub repository: Option<String>,
}

fn default_release_tag() -> String {
    "latest".to_string()
}

fn default_openapi_file() -> String {
    "./openapi.yaml".to_string()
}

fn default_github_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}
