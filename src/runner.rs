//! Runs the pipeline once: gather the release context, generate the post,
//! and hand back a [`GenerationResult`] for the caller to emit.

use chrono::{Local, NaiveDate};
use std::fmt;
use std::io::{self, Write};

use crate::agent::postprocess::postprocess;
use crate::agent::prompt::{PromptError, PromptRenderer};
use crate::agent::{hosted_generator, local_generator, GenerationError, TextGenerator};
use crate::config::{AppConfig, Mode, OutputStyle};
use crate::context::{build_context, ContextError, ReleaseContext};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Gathering release context failed")]
    Context(#[from] ContextError),
    #[error("Building prompt failed")]
    Prompt(#[from] PromptError),
    #[error("Generating blog post failed")]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
}

impl Status {
    /// Marker printed after `STATUS::` for pipelines that grep the output.
    pub fn marker(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Error => "ERROR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub blog_post: String,
    pub references: Vec<String>,
    pub status: Status,
}

impl GenerationResult {
    pub fn emit<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "BLOG_POST::{}", self.blog_post)?;
        writeln!(out, "REFERENCES::{}", self.references.join(" "))?;
        writeln!(out, "STATUS::{}", self.status)?;
        out.flush()
    }
}

pub fn emit_failure<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "STATUS::{}", Status::Error)?;
    out.flush()
}

pub async fn run(config: &AppConfig) -> Result<GenerationResult, RunError> {
    log::info!("gathering release context");
    let context = build_context(config).await?;
    log::info!(
        "gathered context for {} {}: {} pull requests, {} issue events",
        context.repo,
        context.release_tag,
        context.pr_titles.len(),
        context.issue_summaries.len()
    );

    log::info!("generating {} post", config.output_format);
    let today = Local::now().date_naive();
    let result = match config.mode() {
        Mode::Offline => {
            let generator = local_generator(&config.llm_model, config.llm_url.as_deref())?;
            generate_post(&generator, &context, config.output_format, today).await?
        }
        Mode::Live => {
            let generator =
                hosted_generator(&config.llm_model, config.openai_api_key.as_deref())?;
            generate_post(&generator, &context, config.output_format, today).await?
        }
    };
    log::info!("done");
    Ok(result)
}

pub async fn generate_post<G: TextGenerator>(
    generator: &G,
    context: &ReleaseContext,
    style: OutputStyle,
    today: NaiveDate,
) -> Result<GenerationResult, RunError> {
    let renderer = PromptRenderer::new()?;
    let prompt = renderer.render(context, style, today)?;
    log::debug!("rendered prompt ({} characters)", prompt.len());

    let text = generator.generate(&prompt).await?;
    let blog_post = postprocess(&text, style, &context.repo, &context.release_tag, today);

    Ok(GenerationResult {
        blog_post,
        references: context.docs_urls.clone(),
        status: Status::Success,
    })
}
