//! Link graph construction over a resolved vault tree.
//!
//! # Responsibility
//! - Turn note references into a deduplicated directed edge list.
//! - Weight nodes by connectivity and report undirected degree.
//!
//! # Invariants
//! - One node per note; folders never become nodes.
//! - At most one edge per ordered `(source, target)` pair.
//! - No self-edges; unresolved references never create nodes.
//! - Node size starts at `NODE_BASE_SIZE`, grows by `NODE_SIZE_INCREMENT`
//!   per first-inserted edge endpoint, and never exceeds `NODE_MAX_SIZE`.
//!
//! Results are snapshots: they hold ids, not references into the tree, and
//! must be rebuilt after any content change.

use crate::links::extract_references;
use crate::model::entry::{EntryId, VaultEntry};
use crate::vault::tree::notes_with_depth;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

pub const NODE_BASE_SIZE: u32 = 8;
pub const NODE_SIZE_INCREMENT: u32 = 2;
pub const NODE_MAX_SIZE: u32 = 20;

/// One note in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: EntryId,
    /// Display name (extension stripped).
    pub name: String,
    /// Folder depth of the note when the graph was built.
    pub group: usize,
    pub size: u32,
}

/// Directed reference from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: EntryId,
    pub target: EntryId,
    /// Renderer weight; always 1 since edges are deduplicated.
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl LinkGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|edge| edge.source == source && edge.target == target)
    }
}

/// Builds the link graph for every note in `tree`.
///
/// A reference resolves to the first note, in pre-order, whose display name
/// equals it case-insensitively. When that first match is the referencing
/// note itself the reference is dropped.
pub fn build_graph(tree: &[VaultEntry]) -> LinkGraph {
    let notes = notes_with_depth(tree);

    let mut nodes: Vec<GraphNode> = Vec::with_capacity(notes.len());
    let mut node_index: HashMap<&str, usize> = HashMap::with_capacity(notes.len());
    let mut by_name: HashMap<String, &str> = HashMap::with_capacity(notes.len());

    for (note, depth) in &notes {
        if node_index.contains_key(note.id.as_str()) {
            continue;
        }
        node_index.insert(note.id.as_str(), nodes.len());
        nodes.push(GraphNode {
            id: note.id.clone(),
            name: note.display_name().to_string(),
            group: *depth,
            size: NODE_BASE_SIZE,
        });
        by_name
            .entry(note.display_name().to_lowercase())
            .or_insert(note.id.as_str());
    }

    let mut edges = Vec::new();
    let mut seen_edges: HashSet<(&str, &str)> = HashSet::new();
    for (note, _) in &notes {
        let source = note.id.as_str();
        for reference in extract_references(&note.content) {
            let Some(&target) = by_name.get(&reference.to_lowercase()) else {
                continue;
            };
            if target == source || !seen_edges.insert((source, target)) {
                continue;
            }

            edges.push(GraphEdge {
                source: source.to_string(),
                target: target.to_string(),
                value: 1,
            });
            for endpoint in [source, target] {
                if let Some(&index) = node_index.get(endpoint) {
                    let node = &mut nodes[index];
                    node.size = (node.size + NODE_SIZE_INCREMENT).min(NODE_MAX_SIZE);
                }
            }
        }
    }

    LinkGraph { nodes, edges }
}

/// Undirected degree per node; every edge counts once for each endpoint.
pub fn calculate_centrality(graph: &LinkGraph) -> BTreeMap<EntryId, usize> {
    let mut centrality = graph
        .nodes
        .iter()
        .map(|node| (node.id.clone(), 0))
        .collect::<BTreeMap<_, _>>();
    for edge in &graph.edges {
        *centrality.entry(edge.source.clone()).or_insert(0) += 1;
        *centrality.entry(edge.target.clone()).or_insert(0) += 1;
    }
    centrality
}
