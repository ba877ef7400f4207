pub mod postprocess;
pub mod prompt;

use anyhow::Context;
use std::future::Future;

use rig::agent::Agent as RigAgent;
use rig::client::{CompletionClient, Nothing};
use rig::completion::{CompletionModel, Prompt};
use rig::providers::{ollama, openai};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("OPENAI_API_KEY must be set when not running in offline mode")]
    MissingApiKey,
    #[error("Model returned an empty response")]
    EmptyResponse,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Turns a fully rendered prompt into generated text.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GenerationError>>;
}

pub struct RigGenerator<M: CompletionModel> {
    agent: RigAgent<M>,
    backend: &'static str,
}

impl<M: CompletionModel> RigGenerator<M> {
    pub fn new(agent: RigAgent<M>, backend: &'static str) -> Self {
        Self { agent, backend }
    }
}

impl<M> TextGenerator for RigGenerator<M>
where
    M: CompletionModel + 'static,
{
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        log::info!("sending prompt to {} model", self.backend);
        let response = self
            .agent
            .prompt(prompt.to_string())
            .await
            .with_context(|| format!("{} completion request failed", self.backend))?;

        let text = response.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        log::info!("received {} characters from the model", text.len());
        Ok(text.to_string())
    }
}

/// Hosted OpenAI model, used in live mode.
pub fn hosted_generator(
    model: &str,
    api_key: Option<&str>,
) -> Result<impl TextGenerator, GenerationError> {
    let api_key = api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or(GenerationError::MissingApiKey)?;
    if model.trim().is_empty() {
        log::warn!("LLM_MODEL is empty, the backend will likely reject the request");
    }

    let client: openai::Client = openai::Client::new(api_key).context("Building OpenAI client")?;
    Ok(RigGenerator::new(client.agent(model).build(), "openai"))
}

/// Local Ollama model, used in offline mode. No credentials required.
pub fn local_generator(
    model: &str,
    base_url: Option<&str>,
) -> Result<impl TextGenerator, GenerationError> {
    let base_url = base_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(DEFAULT_OLLAMA_URL);
    log::info!("using local model '{}' at {}", model, base_url);

    let client: ollama::Client = ollama::Client::builder()
        .api_key(Nothing)
        .base_url(base_url)
        .build()
        .context("Building Ollama client")?;
    Ok(RigGenerator::new(client.agent(model).build(), "ollama"))
}
