use chrono::NaiveDate;
use handlebars::Handlebars;
use serde::Serialize;

use crate::config::OutputStyle;
use crate::context::ReleaseContext;
use crate::sanitize::{ensure_nonempty, safe_join};

pub const SYSTEM_PROMPT: &str = r#"
# Task
You are a technical writer who turns software releases into engaging blog posts for developers.

You are given:

1. **Release metadata** (tag and notes)
2. **Pull requests** and **issues** tied to the release
3. **API specification** for the project, when one is available

Write a **public-facing blog post** that highlights what is new in this release.

---

# Hard Requirements

1. Follow the output format guidance exactly.
2. Always use the provided release tag: **{{release_tag}}**.
3. Always use today's date: **{{today}}**.
4. Always use the repository URL **{{repo_url}}** in links.
5. Do not invent other tags, links, or dates.

---

# Output Format

{{format_guidance}}

## Title
Use the release name (e.g. *Widgets API v1.2.0 Released: Authentication & Comments*).

## Introduction
- High-level summary of the release.
- What it means for developers.

## Highlights
- Bullet-point summary of the biggest improvements.

## New Features
- Describe each new endpoint in the API specification in plain language.
- Include a **sample request and response** taken from the schema.

## Improvements & Fixes
- Explain error code changes or improved error handling.
- Show an example (e.g. `GET /posts/{id}` now returns `404` instead of `500`).

## Closing
- Encourage developers to try out the new endpoints.
- Mention where to find docs (link to the API specification if available).


Context:
Release Notes: {{release_notes}}
Release Tag: {{release_tag}}
PR Titles: {{pr_titles}}
PR Descriptions: {{pr_descriptions}}
Issues: {{issue_summaries}}
OpenAPI: {{openapi_diff}}
Docs: {{docs_urls}}
"#;

const MARKDOWN_GUIDANCE: &str = r#"
Write the post in plain Markdown (GitHub Flavored).
"#;

const JEKYLL_GUIDANCE: &str = r#"
Write the post as a Jekyll blog entry. You must begin with this exact YAML front matter:

---
layout: post
title: "Release {{release_tag}} - Highlights"
date: {{today}}
categories: release
---

After the YAML front matter, continue the body using Markdown.
"#;

const MKDOCS_GUIDANCE: &str = r#"
Write the post as MkDocs content.
- Assume it will go into `docs/releases/{{release_tag}}.md`.
- Use MkDocs-style admonitions (!!! note, !!! warning).
- Keep headings consistent with MkDocs nav.
"#;

const SYSTEM_TEMPLATE: &str = "system";

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Invalid prompt template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),
    #[error("Rendering prompt: {0}")]
    Render(#[from] handlebars::RenderError),
}

pub fn format_guidance(style: OutputStyle) -> &'static str {
    match style {
        OutputStyle::Markdown => MARKDOWN_GUIDANCE,
        OutputStyle::Jekyll => JEKYLL_GUIDANCE,
        OutputStyle::Mkdocs => MKDOCS_GUIDANCE,
    }
}

/// Values for every slot of [`SYSTEM_PROMPT`], already sanitized.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PromptInputs {
    pub format_guidance: String,
    pub release_notes: String,
    pub pr_titles: String,
    pub pr_descriptions: String,
    pub issue_summaries: String,
    pub openapi_diff: String,
    pub docs_urls: String,
    pub release_tag: String,
    pub today: String,
    pub repo_url: String,
}

impl PromptInputs {
    /// `format_guidance` is left empty; [`PromptRenderer::render`] fills it in.
    pub fn from_context(context: &ReleaseContext, today: NaiveDate) -> Self {
        Self {
            format_guidance: String::new(),
            release_notes: ensure_nonempty(Some(&context.release_notes)).to_string(),
            pr_titles: safe_join(&context.pr_titles),
            pr_descriptions: safe_join(&context.pr_descriptions),
            issue_summaries: safe_join(&context.issue_summaries),
            openapi_diff: ensure_nonempty(context.openapi_diff.as_deref()).to_string(),
            docs_urls: safe_join(&context.docs_urls),
            release_tag: context.release_tag.clone(),
            today: today.format("%Y-%m-%d").to_string(),
            repo_url: format!("https://github.com/{}", context.repo),
        }
    }
}

/// Strict renderer: a slot without a value fails instead of rendering empty.
pub struct PromptRenderer {
    registry: Handlebars<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, PromptError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(SYSTEM_TEMPLATE, SYSTEM_PROMPT)
            .map_err(Box::new)?;
        for style in [OutputStyle::Markdown, OutputStyle::Jekyll, OutputStyle::Mkdocs] {
            registry
                .register_template_string(style.as_str(), format_guidance(style))
                .map_err(Box::new)?;
        }
        Ok(Self { registry })
    }

    pub fn render(
        &self,
        context: &ReleaseContext,
        style: OutputStyle,
        today: NaiveDate,
    ) -> Result<String, PromptError> {
        let mut inputs = PromptInputs::from_context(context, today);
        inputs.format_guidance = self.registry.render(style.as_str(), &inputs)?;
        self.render_inputs(&inputs)
    }

    /// Renders the system template against arbitrary data.
    pub fn render_inputs<T: Serialize>(&self, data: &T) -> Result<String, PromptError> {
        Ok(self.registry.render(SYSTEM_TEMPLATE, data)?)
    }
}
