//! Reference, heading and tag extraction.
//!
//! # Invariants
//! - Reference names are trimmed; the alias after `|` never takes part in
//!   resolution.
//! - Reference and tag lists are distinct, in order of first appearance.
//! - Reference dedup is case-insensitive but keeps the first spelling.
//! - Heading slugs are not deduplicated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum characters kept from a backlink's context line.
pub const BACKLINK_CONTEXT_MAX_CHARS: usize = 80;

const EMPTY_CONTEXT: &str = "(no context)";

static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]\r\n]+)\]\]").expect("valid reference regex"));
static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,3})[ \t]+(.+)$").expect("valid heading regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("valid tag regex"));
static SLUG_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid slug strip regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// One markdown heading (levels 1 to 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    /// Anchor slug; may collide with other headings in the same document.
    pub slug: String,
}

/// A note that references the target note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backlink {
    /// Path of the referencing note.
    pub from: String,
    /// Target name as requested by the caller.
    pub to: String,
    /// First line carrying the reference, trimmed and truncated.
    pub context: String,
}

/// Extracts distinct reference names from `text`.
///
/// `[[Foo]]`, `[[Foo|Bar]]` and `[[foo]]` all collapse into `Foo`.
pub fn extract_references(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    for name in reference_names(text) {
        if seen.insert(name.to_lowercase()) {
            references.push(name.to_string());
        }
    }
    references
}

/// Extracts level 1 to 3 headings in document order.
pub fn extract_headings(text: &str) -> Vec<Heading> {
    HEADING_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let level = caps.get(1)?.as_str().len() as u8;
            let heading_text = caps.get(2)?.as_str().trim();
            if heading_text.is_empty() {
                return None;
            }
            Some(Heading {
                level,
                text: heading_text.to_string(),
                slug: slugify(heading_text),
            })
        })
        .collect()
}

/// Extracts distinct `#tag` names (first word-character run after `#`).
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    TAG_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|tag| seen.insert(*tag))
        .map(str::to_string)
        .collect()
}

/// Finds every document in `corpus` that references `target_name`.
///
/// `corpus` yields `(path, content)` pairs. At most one backlink is emitted
/// per document. Its context is the first line holding the literal
/// `[[target]]` form, or the first aliased reference when there is none.
pub fn find_backlinks<'a, I>(target_name: &str, corpus: I) -> Vec<Backlink>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let target = target_name.trim().to_lowercase();
    if target.is_empty() {
        return Vec::new();
    }

    corpus
        .into_iter()
        .filter(|(_, content)| {
            extract_references(content)
                .iter()
                .any(|name| name.to_lowercase() == target)
        })
        .map(|(path, content)| Backlink {
            from: path.to_string(),
            to: target_name.to_string(),
            context: context_line(content, &target),
        })
        .collect()
}

/// Lowercases, strips punctuation and turns every whitespace run into `-`.
///
/// Leading and trailing whitespace is not trimmed first, so `"! Hello"`
/// becomes `"-hello"`. `\w` is Unicode-aware, so accented letters survive.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = SLUG_STRIP_RE.replace_all(&lowered, "");
    WHITESPACE_RE.replace_all(&stripped, "-").into_owned()
}

fn reference_names(text: &str) -> impl Iterator<Item = &str> {
    REFERENCE_RE.captures_iter(text).filter_map(|caps| {
        let inner = caps.get(1)?.as_str();
        let name = inner.split('|').next().unwrap_or(inner).trim();
        (!name.is_empty()).then_some(name)
    })
}

/// Whether `line` holds the literal `[[target]]` form (name compared
/// case-insensitively, no alias).
fn has_literal_reference(line: &str, target_lower: &str) -> bool {
    REFERENCE_RE.captures_iter(line).any(|caps| {
        caps.get(1)
            .is_some_and(|inner| inner.as_str().to_lowercase() == target_lower)
    })
}

/// Prefers the first line with the literal `[[target]]` form and falls back
/// to the first line with any form, aliases included.
fn context_line(content: &str, target_lower: &str) -> String {
    let line = content
        .lines()
        .find(|line| has_literal_reference(line, target_lower))
        .or_else(|| {
            content.lines().find(|line| {
                reference_names(line).any(|name| name.to_lowercase() == target_lower)
            })
        });
    let trimmed = line.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return EMPTY_CONTEXT.to_string();
    }
    trimmed.chars().take(BACKLINK_CONTEXT_MAX_CHARS).collect()
}
