//! Placeholder substitution for prompt inputs.
//!
//! A blank slot in the prompt reads to the model like a truncated instruction,
//! so every value passes through one of these before rendering.

pub const PLACEHOLDER: &str = "N/A";

pub fn ensure_nonempty(value: Option<&str>) -> &str {
    ensure_nonempty_or(value, PLACEHOLDER)
}

pub fn ensure_nonempty_or<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => placeholder,
    }
}

pub fn safe_join<S: AsRef<str>>(items: &[S]) -> String {
    safe_join_or(items, PLACEHOLDER)
}

/// Joins the non-blank items with newlines, keeping their order.
pub fn safe_join_or<S: AsRef<str>>(items: &[S], placeholder: &str) -> String {
    let joined = items
        .iter()
        .map(AsRef::as_ref)
        .filter(|item| !item.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if joined.trim().is_empty() {
        placeholder.to_string()
    } else {
        joined
    }
}
