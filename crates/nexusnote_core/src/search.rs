//! Boundary to the ranked full-text search collaborator.
//!
//! The core never ranks text itself. It hands the collaborator a flat
//! corpus of notes and receives scored matches back.

use crate::model::entry::{EntryId, VaultEntry};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// The query cannot be interpreted by the collaborator.
    InvalidQuery { query: String, message: String },
    /// The collaborator failed.
    Provider(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid search query `{query}`: {message}")
            }
            Self::Provider(message) => write!(f, "search provider failed: {message}"),
        }
    }
}

impl Error for SearchError {}

/// One searchable note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: EntryId,
    pub path: String,
    pub name: String,
    pub content: String,
}

impl From<&VaultEntry> for SearchDocument {
    fn from(entry: &VaultEntry) -> Self {
        Self {
            id: entry.id.clone(),
            path: entry.path.clone(),
            name: entry.name.clone(),
            content: entry.content.clone(),
        }
    }
}

/// Scored hit returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: EntryId,
    /// Provider-defined relevance; higher is better.
    pub score: f64,
    /// Highlighted byte ranges `(start, end)` inside the document content.
    #[serde(default)]
    pub highlights: Vec<(usize, usize)>,
}

/// Ranked matching service supplied by the host application.
pub trait SearchProvider {
    fn search(&self, query: &str, corpus: &[SearchDocument]) -> SearchResult<Vec<SearchMatch>>;
}

/// Runs `provider` over `corpus`, ignoring blank queries and dropping
/// matches whose id is not in the corpus.
pub fn run_search(
    provider: &dyn SearchProvider,
    query: &str,
    corpus: &[SearchDocument],
) -> SearchResult<Vec<SearchMatch>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let mut matches = provider.search(query, corpus)?;
    matches.retain(|hit| corpus.iter().any(|document| document.id == hit.id));
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::{run_search, SearchDocument, SearchMatch, SearchProvider, SearchResult};

    struct EchoProvider;

    impl SearchProvider for EchoProvider {
        fn search(&self, _query: &str, corpus: &[SearchDocument]) -> SearchResult<Vec<SearchMatch>> {
            let mut hits = corpus
                .iter()
                .map(|document| SearchMatch {
                    id: document.id.clone(),
                    score: 1.0,
                    highlights: Vec::new(),
                })
                .collect::<Vec<_>>();
            hits.push(SearchMatch {
                id: "ghost".to_string(),
                score: 0.5,
                highlights: Vec::new(),
            });
            Ok(hits)
        }
    }

    fn document(id: &str) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            path: format!("nexusnote/{id}.md"),
            name: format!("{id}.md"),
            content: String::new(),
        }
    }

    #[test]
    fn blank_query_skips_provider() {
        let hits = run_search(&EchoProvider, "   ", &[document("a")]).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn unknown_ids_are_dropped() {
        let hits = run_search(&EchoProvider, "x", &[document("a")]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }
}
