//! Vault dashboard figures.

use super::tree::{count_entries, notes};
use crate::graph::build_graph;
use crate::links::extract_references;
use crate::model::entry::{EntryId, VaultEntry};
use serde::{Deserialize, Serialize};

/// Number of notes reported in `VaultStats::most_linked`.
pub const MOST_LINKED_LIMIT: usize = 5;

/// Note with its count of distinct outgoing references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCount {
    pub id: EntryId,
    pub name: String,
    pub links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStats {
    pub total_notes: usize,
    pub total_folders: usize,
    /// Resolved graph edges.
    pub total_links: usize,
    /// Top notes by distinct references in their bodies; ties keep tree
    /// order.
    pub most_linked: Vec<LinkCount>,
}

pub fn compute_stats(tree: &[VaultEntry]) -> VaultStats {
    let (total_notes, total_folders) = count_entries(tree);
    let total_links = build_graph(tree).edges.len();

    let mut most_linked = notes(tree)
        .into_iter()
        .map(|note| LinkCount {
            id: note.id.clone(),
            name: note.display_name().to_string(),
            links: extract_references(&note.content).len(),
        })
        .collect::<Vec<_>>();
    most_linked.sort_by(|left, right| right.links.cmp(&left.links));
    most_linked.truncate(MOST_LINKED_LIMIT);

    VaultStats {
        total_notes,
        total_folders,
        total_links,
        most_linked,
    }
}
