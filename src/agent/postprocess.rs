use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::config::OutputStyle;

// Tag segment stops at link/markup delimiters so `[..](url)` keeps its paren.
static RELEASE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://github\.com/[^/\s]+/[^/\s]+/releases/tag/[^\s)\]<>"']+"#)
        .expect("release link regex is valid")
});

pub fn postprocess(
    text: &str,
    style: OutputStyle,
    repo: &str,
    release_tag: &str,
    today: NaiveDate,
) -> String {
    let mut post = text.to_string();
    if style == OutputStyle::Jekyll {
        post = enforce_front_matter(&post, release_tag, today);
    }
    if matches!(style, OutputStyle::Jekyll | OutputStyle::Mkdocs) {
        post = rewrite_release_links(&post, repo, release_tag);
    }
    post
}

/// Prepends Jekyll front matter unless the text already opens with a `---` block.
pub fn enforce_front_matter(text: &str, release_tag: &str, today: NaiveDate) -> String {
    if text.trim_start().starts_with("---") {
        return text.to_string();
    }
    log::info!("model omitted front matter, adding it");
    format!(
        "---\nlayout: post\ntitle: \"Release {} - Highlights\"\ndate: {}\ncategories: release\n---\n\n{}",
        release_tag,
        today.format("%Y-%m-%d"),
        text
    )
}

/// Points every GitHub release link at `repo`'s page for `release_tag`.
///
/// Links that already point there are left alone, even when the tag itself
/// contains a delimiter the pattern stops at.
pub fn rewrite_release_links(text: &str, repo: &str, release_tag: &str) -> String {
    let canonical = format!("https://github.com/{}/releases/tag/{}", repo, release_tag);
    RELEASE_LINK_RE
        .replace_all(text, |caps: &Captures| match caps.get(0) {
            Some(m) if is_canonical_at(text, m.start(), &canonical) => m.as_str().to_string(),
            _ => canonical.clone(),
        })
        .into_owned()
}

fn is_canonical_at(text: &str, start: usize, canonical: &str) -> bool {
    match text[start..].strip_prefix(canonical) {
        Some(rest) => rest
            .chars()
            .next()
            .map_or(true, |c| c.is_whitespace() || ")]<>\"'".contains(c)),
        None => false,
    }
}
