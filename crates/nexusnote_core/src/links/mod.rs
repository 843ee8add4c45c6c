//! Inline reference parsing over raw note bodies.
//!
//! # Responsibility
//! - Extract `[[Target]]` / `[[Target|Alias]]` references, headings and tags.
//! - Locate the lines that give backlinks their context.
//!
//! # Invariants
//! - Pure functions only: no storage access, no shared state.

pub mod parser;

pub use parser::{
    extract_headings, extract_references, extract_tags, find_backlinks, Backlink, Heading,
    BACKLINK_CONTEXT_MAX_CHARS,
};
