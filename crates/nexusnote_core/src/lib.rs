//! Core engine for NexusNote vaults.
//! Storage backends, tree reconstruction and the link graph live here; the
//! CLI and any UI are thin callers of `Vault`.

pub mod config;
pub mod db;
pub mod graph;
pub mod hierarchy;
pub mod links;
pub mod logging;
pub mod model;
pub mod search;
pub mod store;
pub mod vault;

pub use config::{BackendSelection, ConfigError, VaultConfig};
pub use graph::{build_graph, calculate_centrality, GraphEdge, GraphNode, LinkGraph};
pub use hierarchy::{reconstruct, ReconstructMode};
pub use links::{
    extract_headings, extract_references, extract_tags, find_backlinks, Backlink, Heading,
};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::entry::{display_name, EntryId, VaultEntry};
pub use search::{SearchDocument, SearchError, SearchMatch, SearchProvider};
pub use store::{
    BackendKind, FsNoteStore, NoteStore, PendingRename, SqliteNoteStore, StoreError, StoreListing,
    StoreResult,
};
pub use vault::{ReconcileReport, Vault, VaultError, VaultResult, VaultStats};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
