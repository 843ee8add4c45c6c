//! Vault facade over one note store.
//!
//! # Responsibility
//! - Offer one tree-shaped API regardless of backend flavour.
//! - Sequence multi-step mutations (rename, folder re-pathing) on top of
//!   single-entity store calls.
//! - Compute derived views (graph, backlinks, headings, tags, stats) from a
//!   fresh tree snapshot on every call.
//!
//! # Invariants
//! - `get_all` never returns the same id twice.
//! - Rename never merges two entities: an occupied target path fails with
//!   `VaultError::AlreadyExists`.
//! - Folder rename on hierarchical storage fails with
//!   `VaultError::Unimplemented`; it is never a silent no-op.
//! - Nothing is cached; every read goes to the store.

pub mod reconcile;
pub mod stats;
pub mod tree;

use crate::config::{ConfigError, VaultConfig};
use crate::graph::{self, LinkGraph};
use crate::hierarchy::{reconstruct, ReconstructMode};
use crate::links::{extract_headings, extract_tags, find_backlinks, Backlink, Heading};
use crate::model::entry::{
    display_name, generate_entry_id, join_path, note_file_name, EntryId, VaultEntry,
    NOTE_EXTENSION,
};
use crate::search::{run_search, SearchDocument, SearchError, SearchMatch, SearchProvider};
use crate::store::{
    validate_entry_name, BackendKind, FsNoteStore, NoteStore, PendingRename, SqliteNoteStore,
    StoreError, StoreListing,
};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use reconcile::ReconcileReport;
pub use stats::{LinkCount, VaultStats};

pub type VaultResult<T> = Result<T, VaultError>;

/// Facade error for vault use-cases.
#[derive(Debug)]
pub enum VaultError {
    /// Id, path or name does not resolve to an entry.
    NotFound(String),
    /// Target id or path is occupied by another entry.
    AlreadyExists(String),
    /// Operation is not available on the active backend.
    Unimplemented(&'static str),
    /// Name cannot be stored.
    InvalidName(String),
    /// Any other store failure.
    Store(StoreError),
    Config(ConfigError),
    Search(SearchError),
}

impl Display for VaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "not found: {key}"),
            Self::AlreadyExists(key) => write!(f, "already exists: {key}"),
            Self::Unimplemented(operation) => write!(f, "unimplemented: {operation}"),
            Self::InvalidName(name) => write!(f, "invalid name: `{name}`"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
        }
    }
}

impl Error for VaultError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Search(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for VaultError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(key) => Self::NotFound(key),
            StoreError::AlreadyExists(key) => Self::AlreadyExists(key),
            StoreError::Unimplemented(operation) => Self::Unimplemented(operation),
            StoreError::InvalidName(name) => Self::InvalidName(name),
            other => Self::Store(other),
        }
    }
}

impl From<ConfigError> for VaultError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SearchError> for VaultError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}

/// Single entry point over a note store.
pub struct Vault {
    store: Box<dyn NoteStore>,
    root_segment: String,
    mode: ReconstructMode,
}

impl Vault {
    /// Wraps an already opened store. Does not run reconciliation.
    pub fn new(
        store: Box<dyn NoteStore>,
        root_segment: impl Into<String>,
        mode: ReconstructMode,
    ) -> Self {
        Self {
            store,
            root_segment: root_segment.into(),
            mode,
        }
    }

    /// Opens the backend selected by `config` and recovers interrupted
    /// renames before returning.
    pub fn open(config: &VaultConfig) -> VaultResult<Self> {
        config.validate()?;
        let backend = config.backend_kind();
        let store: Box<dyn NoteStore> = match backend {
            BackendKind::Flat => {
                std::fs::create_dir_all(&config.data_dir)
                    .map_err(|err| StoreError::io(&config.data_dir, err))?;
                Box::new(SqliteNoteStore::open(config.db_path())?)
            }
            BackendKind::Hierarchical => Box::new(FsNoteStore::new(
                config.data_dir.clone(),
                config.root_segment.clone(),
            )?),
        };

        let vault = Self::new(store, config.root_segment.clone(), config.reconstruct_mode());
        let report = vault.reconcile()?;
        info!(
            "event=vault_open module=vault status=ok backend={} mode={:?} recovered={} conflicts={}",
            backend.as_str(),
            vault.mode,
            report.resolved.len(),
            report.conflicts.len()
        );
        Ok(vault)
    }

    pub fn backend(&self) -> BackendKind {
        self.store.backend()
    }

    pub fn root_segment(&self) -> &str {
        &self.root_segment
    }

    pub fn mode(&self) -> ReconstructMode {
        self.mode
    }

    pub fn store(&self) -> &dyn NoteStore {
        self.store.as_ref()
    }

    /// Returns the whole vault as root-level entries with nested children.
    pub fn get_all(&self) -> VaultResult<Vec<VaultEntry>> {
        let tree = match self.store.list_all()? {
            StoreListing::Flat(records) => reconstruct(records, &self.root_segment, self.mode),
            StoreListing::Tree(entries) => entries,
        };
        Ok(tree)
    }

    /// Loads one entry by id.
    ///
    /// Flat-storage folders come back with the children reconstruction gives
    /// them; synthesized folders (no record of their own) are served from
    /// the tree.
    pub fn get_one(&self, id: &str) -> VaultResult<VaultEntry> {
        match self.store.read(id) {
            Ok(entry) if entry.is_directory && !self.backend().has_native_hierarchy() => {
                let tree = self.get_all()?;
                Ok(tree::find_by_id(&tree, id).cloned().unwrap_or(entry))
            }
            Ok(entry) => Ok(entry),
            Err(StoreError::NotFound(key)) => {
                let tree = self.get_all()?;
                tree::find_by_id(&tree, id)
                    .cloned()
                    .ok_or(VaultError::NotFound(key))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Overwrites a note's content.
    pub fn save(&self, entry: &VaultEntry) -> VaultResult<()> {
        self.store.update(entry)?;
        debug!(
            "event=vault_save module=vault status=ok backend={} bytes={}",
            self.backend().as_str(),
            entry.content.len()
        );
        Ok(())
    }

    /// Persists a new entry; a blank id is replaced with a fresh one.
    pub fn create(&self, entry: &VaultEntry) -> VaultResult<VaultEntry> {
        if entry.id.trim().is_empty() {
            let with_id = VaultEntry {
                id: generate_entry_id(),
                ..entry.clone()
            };
            return Ok(self.store.create(&with_id)?);
        }
        Ok(self.store.create(entry)?)
    }

    /// Creates an empty note from a free-form title inside `target_folder`
    /// (the vault root when `None`).
    pub fn create_note(&self, title: &str, target_folder: Option<&str>) -> VaultResult<VaultEntry> {
        let name =
            note_file_name(title).ok_or_else(|| VaultError::InvalidName(title.to_string()))?;
        let folder = self.folder_path(target_folder);
        let note = VaultEntry::note(generate_entry_id(), join_path(&folder, &name), name, "");
        let created = self.create(&note)?;
        info!(
            "event=vault_create_note module=vault status=ok backend={}",
            self.backend().as_str()
        );
        Ok(created)
    }

    /// Resolves `name` like a reference and creates the note at the root
    /// when nothing matches.
    pub fn open_or_create_by_name(&self, name: &str) -> VaultResult<VaultEntry> {
        let tree = self.get_all()?;
        if let Some(found) = tree::find_note_by_name(&tree, name) {
            return Ok(found.clone());
        }

        let file = note_file_name(name).ok_or_else(|| VaultError::InvalidName(name.to_string()))?;
        let body = format!("# {}\n\n", display_name(&file));
        let note = VaultEntry::note(
            generate_entry_id(),
            join_path(&self.root_segment, &file),
            file,
            body,
        );
        let created = self.create(&note)?;
        info!("event=vault_create_by_name module=vault status=ok");
        Ok(created)
    }

    /// Deletes an entry; folders go with everything below them.
    pub fn delete(&self, entry: &VaultEntry) -> VaultResult<()> {
        self.store.delete(entry)?;
        info!(
            "event=vault_delete module=vault status=ok backend={} is_directory={}",
            self.backend().as_str(),
            entry.is_directory
        );
        Ok(())
    }

    /// Renames an entry inside its current folder.
    ///
    /// Notes keep the `.md` extension. The rename is journaled first, so an
    /// interruption between writing the new note and deleting the old one is
    /// repaired by `reconcile`. A failure that leaves the old note as the only
    /// copy clears the journal before the error is returned.
    pub fn rename(&self, entry: &VaultEntry, new_name: &str) -> VaultResult<VaultEntry> {
        let new_name = new_name.trim();
        let new_name = if entry.is_directory || new_name.ends_with(NOTE_EXTENSION) {
            new_name.to_string()
        } else {
            format!("{new_name}{NOTE_EXTENSION}")
        };
        validate_entry_name(&new_name)?;

        let new_path = join_path(entry.parent_path(), &new_name);
        if new_path == entry.path {
            return Ok(entry.clone());
        }

        let tree = self.get_all()?;
        if let Some(occupant) = tree::find_by_path(&tree, &new_path) {
            if occupant.id != entry.id {
                return Err(VaultError::AlreadyExists(new_path));
            }
        }

        if entry.is_directory {
            if !self.backend().supports_folder_rename() {
                return Err(VaultError::Unimplemented(
                    "folder rename on hierarchical storage",
                ));
            }
            return self.rename_flat_folder(entry, new_name, new_path);
        }
        self.rename_note(entry, new_name, new_path)
    }

    fn rename_note(
        &self,
        entry: &VaultEntry,
        new_name: String,
        new_path: String,
    ) -> VaultResult<VaultEntry> {
        let current = self.store.read(&entry.id)?;
        self.store.journal_rename(&PendingRename {
            entry_id: current.id.clone(),
            old_path: current.path.clone(),
            new_path: new_path.clone(),
        })?;

        let renamed = if self.backend().keeps_id_on_rename() {
            let moved = VaultEntry::note(current.id.clone(), new_path, new_name, current.content.clone());
            if let Err(err) = self.store.update(&moved) {
                return Err(self.abandon_rename(&current, err));
            }
            moved
        } else {
            let copy = VaultEntry::note(generate_entry_id(), new_path, new_name, current.content.clone());
            let created = match self.store.create(&copy) {
                Ok(created) => created,
                Err(err) => return Err(self.abandon_rename(&current, err)),
            };
            if let Err(err) = self.store.delete(&current) {
                if self.store.delete(&created).is_ok() {
                    return Err(self.abandon_rename(&current, err));
                }
                // Both copies exist; the journal lets `reconcile` drop the old one.
                warn!(
                    "event=vault_rename module=vault status=error backend={} journal=kept error={err}",
                    self.backend().as_str()
                );
                return Err(err.into());
            }
            created
        };

        self.store.clear_rename(&current.id)?;
        info!(
            "event=vault_rename module=vault status=ok backend={} is_directory=false",
            self.backend().as_str()
        );
        Ok(renamed)
    }

    /// Drops the journal entry of a rename that failed while the old note was
    /// still the only copy, so `reconcile` never acts on it.
    fn abandon_rename(&self, current: &VaultEntry, err: StoreError) -> VaultError {
        if let Err(clear_err) = self.store.clear_rename(&current.id) {
            warn!(
                "event=vault_rename module=vault status=error journal=stale entry_id={} error={clear_err}",
                current.id
            );
        }
        warn!(
            "event=vault_rename module=vault status=error backend={} journal=cleared error={err}",
            self.backend().as_str()
        );
        err.into()
    }

    fn rename_flat_folder(
        &self,
        entry: &VaultEntry,
        new_name: String,
        new_path: String,
    ) -> VaultResult<VaultEntry> {
        let StoreListing::Flat(records) = self.store.list_all()? else {
            return Err(VaultError::Unimplemented("folder rename on hierarchical storage"));
        };

        let old_prefix = format!("{}/", entry.path);
        let mut moved_count = 0usize;
        for record in records.iter().filter(|record| record.path.starts_with(&old_prefix)) {
            let moved = VaultEntry {
                path: format!("{new_path}/{}", &record.path[old_prefix.len()..]),
                ..record.clone()
            };
            self.store.update(&moved)?;
            moved_count += 1;
        }

        // Synthesized folders have no record; their new id follows the new path.
        let renamed = if records.iter().any(|record| record.id == entry.id) {
            let renamed = VaultEntry::folder(entry.id.clone(), new_path, new_name);
            self.store.update(&renamed)?;
            renamed
        } else {
            VaultEntry::synthesized_folder(new_path, new_name)
        };

        info!(
            "event=vault_rename module=vault status=ok backend=flat is_directory=true descendants={moved_count}"
        );
        Ok(renamed)
    }

    /// Creates a folder named `name` under `parent` (the root when `None`).
    pub fn create_folder(&self, parent: Option<&str>, name: &str) -> VaultResult<VaultEntry> {
        let parent = self.folder_path(parent);
        let folder = self.store.create_container(&parent, name.trim())?;
        info!(
            "event=vault_create_folder module=vault status=ok backend={}",
            self.backend().as_str()
        );
        Ok(folder)
    }

    /// Flat list of every note for the search collaborator.
    pub fn corpus(&self) -> VaultResult<Vec<SearchDocument>> {
        let tree = self.get_all()?;
        Ok(tree::notes(&tree)
            .into_iter()
            .map(SearchDocument::from)
            .collect())
    }

    /// Delegates a ranked query to `provider` over the current corpus.
    pub fn search(
        &self,
        provider: &dyn SearchProvider,
        query: &str,
    ) -> VaultResult<Vec<SearchMatch>> {
        let corpus = self.corpus()?;
        Ok(run_search(provider, query, &corpus)?)
    }

    pub fn build_graph(&self) -> VaultResult<LinkGraph> {
        let tree = self.get_all()?;
        Ok(graph::build_graph(&tree))
    }

    /// Notes referencing `target_name`, one backlink per note.
    pub fn backlinks(&self, target_name: &str) -> VaultResult<Vec<Backlink>> {
        let tree = self.get_all()?;
        let notes = tree::notes(&tree);
        Ok(find_backlinks(
            target_name,
            notes
                .iter()
                .map(|note| (note.path.as_str(), note.content.as_str())),
        ))
    }

    /// Headings of the note `id`.
    pub fn headings(&self, id: &str) -> VaultResult<Vec<Heading>> {
        let entry = self.get_one(id)?;
        if entry.is_directory {
            return Ok(Vec::new());
        }
        Ok(extract_headings(&entry.content))
    }

    /// Tag index: tag name to the ids of the notes carrying it, in
    /// pre-order.
    pub fn tags(&self) -> VaultResult<BTreeMap<String, Vec<EntryId>>> {
        let tree = self.get_all()?;
        let mut index: BTreeMap<String, Vec<EntryId>> = BTreeMap::new();
        for note in tree::notes(&tree) {
            for tag in extract_tags(&note.content) {
                index.entry(tag).or_default().push(note.id.clone());
            }
        }
        Ok(index)
    }

    pub fn stats(&self) -> VaultResult<VaultStats> {
        let tree = self.get_all()?;
        Ok(stats::compute_stats(&tree))
    }

    /// Normalizes an optional folder argument to a path under the root.
    fn folder_path(&self, target: Option<&str>) -> String {
        let Some(target) = target.map(|value| value.trim().trim_matches('/')) else {
            return self.root_segment.clone();
        };
        if target.is_empty() || target == self.root_segment {
            return self.root_segment.clone();
        }
        if target.starts_with(&format!("{}/", self.root_segment)) {
            return target.to_string();
        }
        join_path(&self.root_segment, target)
    }
}
