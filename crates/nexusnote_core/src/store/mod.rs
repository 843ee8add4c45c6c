//! Note record store contracts and backend implementations.
//!
//! # Responsibility
//! - Define the one storage interface every vault backend satisfies.
//! - Isolate SQL and filesystem details from the vault facade.
//!
//! # Invariants
//! - `read` of an unknown id fails with `StoreError::NotFound`.
//! - `create` of an occupied id or path fails with `StoreError::AlreadyExists`.
//! - Creating an entry under a missing folder path succeeds.
//! - Failures are surfaced, never swallowed, except for per-entry read
//!   failures during a hierarchical listing (skipped and logged).

use crate::db::DbError;
use crate::model::entry::{file_name, EntryId, VaultEntry};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod fs_store;
pub mod sqlite_store;

pub use fs_store::FsNoteStore;
pub use sqlite_store::SqliteNoteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error taxonomy shared by every backend.
#[derive(Debug)]
pub enum StoreError {
    /// Lookup by id or path missed.
    NotFound(String),
    /// An entry already occupies the id or path.
    AlreadyExists(String),
    /// Filesystem fault.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// SQLite/bootstrap fault.
    Db(DbError),
    /// Operation is not supported by this backend.
    Unimplemented(&'static str),
    /// Entry name or path is not storable.
    InvalidName(String),
    /// Persisted state cannot be decoded.
    InvalidData(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "entry not found: {key}"),
            Self::AlreadyExists(key) => write!(f, "entry already exists: {key}"),
            Self::Io { path, source } => write!(f, "io failure at `{}`: {source}", path.display()),
            Self::Db(err) => write!(f, "{err}"),
            Self::Unimplemented(operation) => write!(f, "operation not supported: {operation}"),
            Self::InvalidName(name) => write!(f, "invalid entry name: `{name}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage backend flavour, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Keyed records with no native nesting; the tree is inferred from paths.
    Flat,
    /// Native directories and files.
    Hierarchical,
}

impl BackendKind {
    /// Whether `list_all` already returns nested structure.
    pub fn has_native_hierarchy(self) -> bool {
        matches!(self, Self::Hierarchical)
    }

    /// Whether ids survive a rename (flat ids are opaque, hierarchical ids
    /// are derived from paths).
    pub fn keeps_id_on_rename(self) -> bool {
        matches!(self, Self::Flat)
    }

    /// Whether folders can be renamed.
    pub fn supports_folder_rename(self) -> bool {
        matches!(self, Self::Flat)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Hierarchical => "hierarchical",
        }
    }
}

/// Result of `NoteStore::list_all`, tagged with its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreListing {
    /// Unordered note and folder records without children.
    Flat(Vec<VaultEntry>),
    /// Root-level entries with children already nested.
    Tree(Vec<VaultEntry>),
}

/// Journal record written before a non-atomic rename starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRename {
    /// Id of the entry being renamed, before the rename.
    pub entry_id: EntryId,
    pub old_path: String,
    pub new_path: String,
}

/// Persistence backend for vault entries.
pub trait NoteStore {
    /// Backend flavour of this store.
    fn backend(&self) -> BackendKind;
    /// Persists a new entry and returns it as stored (with its final id).
    fn create(&self, entry: &VaultEntry) -> StoreResult<VaultEntry>;
    /// Loads one entry by id; folders come back with their children.
    fn read(&self, id: &str) -> StoreResult<VaultEntry>;
    /// Overwrites an existing note's content (and, on flat storage, its
    /// name and path).
    fn update(&self, entry: &VaultEntry) -> StoreResult<()>;
    /// Removes an entry; folders are removed with everything below them.
    fn delete(&self, entry: &VaultEntry) -> StoreResult<()>;
    /// Lists every entry in the backend's native shape.
    fn list_all(&self) -> StoreResult<StoreListing>;
    /// Creates a folder named `name` under `parent_path`.
    fn create_container(&self, parent_path: &str, name: &str) -> StoreResult<VaultEntry>;
    /// Records a rename intent so an interrupted rename can be recovered.
    fn journal_rename(&self, rename: &PendingRename) -> StoreResult<()>;
    /// Lists rename intents that were never cleared.
    fn pending_renames(&self) -> StoreResult<Vec<PendingRename>>;
    /// Drops the rename intent for `entry_id`, if any.
    fn clear_rename(&self, entry_id: &str) -> StoreResult<()>;
}

/// Rejects names that would escape or split a path, and dot-leading names,
/// which hierarchical listings treat as hidden.
pub(crate) fn validate_entry_name(name: &str) -> StoreResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Checks the name and that it is the last segment of the entry's path.
pub(crate) fn validate_entry_location(entry: &VaultEntry) -> StoreResult<()> {
    validate_entry_name(&entry.name)?;
    if file_name(&entry.path) != entry.name {
        return Err(StoreError::InvalidData(format!(
            "entry name `{}` does not match path `{}`",
            entry.name, entry.path
        )));
    }
    Ok(())
}
