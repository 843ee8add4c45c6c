//! Hierarchical backend on the native filesystem.
//!
//! # Responsibility
//! - Map logical vault paths onto a root folder inside the data directory.
//! - Walk directories recursively and load every note body eagerly.
//!
//! # Invariants
//! - Ids are derived from logical paths: `file-<path>` and `dir-<path>`.
//! - Only `.md` files are notes; hidden entries (leading `.`) are ignored.
//! - A single unreadable file or directory entry is skipped and logged,
//!   never fatal to a listing.
//! - Logical paths never contain `.`/`..` segments.

use crate::model::entry::{
    file_id_for_path, file_name, folder_id_for_path, join_path, parent_path, VaultEntry,
    FILE_ID_PREFIX, FOLDER_ID_PREFIX, NOTE_EXTENSION,
};
use crate::store::{
    validate_entry_location, validate_entry_name, BackendKind, NoteStore, PendingRename,
    StoreError, StoreListing, StoreResult,
};
use log::{debug, warn};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const RENAME_JOURNAL_FILE: &str = ".nexusnote-renames.json";

/// Filesystem-backed hierarchical note store.
pub struct FsNoteStore {
    data_dir: PathBuf,
    root_segment: String,
}

impl FsNoteStore {
    /// Creates a store rooted at `data_dir/root_segment`.
    ///
    /// The root folder itself is created lazily on first listing or write.
    pub fn new(data_dir: impl Into<PathBuf>, root_segment: impl Into<String>) -> StoreResult<Self> {
        let root_segment = root_segment.into();
        validate_entry_name(&root_segment)?;
        Ok(Self {
            data_dir: data_dir.into(),
            root_segment,
        })
    }

    /// Absolute location of the vault root folder.
    pub fn root_dir(&self) -> PathBuf {
        self.data_dir.join(&self.root_segment)
    }

    /// Logical path of the vault root.
    pub fn root_segment(&self) -> &str {
        &self.root_segment
    }

    fn resolve(&self, logical: &str) -> StoreResult<PathBuf> {
        let mut segments = logical.split('/');
        if segments.next() != Some(self.root_segment.as_str()) {
            return Err(StoreError::InvalidName(logical.to_string()));
        }

        let mut resolved = self.root_dir();
        for segment in segments {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(StoreError::InvalidName(logical.to_string()));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }

    fn note_path_from_id<'a>(&self, id: &'a str) -> StoreResult<&'a str> {
        id.strip_prefix(FILE_ID_PREFIX)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn read_note(&self, logical: &str) -> StoreResult<VaultEntry> {
        let location = self.resolve(logical)?;
        let content = fs::read_to_string(&location).map_err(|err| map_io(err, &location, logical))?;
        let name = file_name(logical);
        Ok(VaultEntry::note(
            file_id_for_path(logical),
            logical,
            name,
            content,
        ))
    }

    fn read_folder(&self, logical: &str) -> StoreResult<VaultEntry> {
        let location = self.resolve(logical)?;
        let metadata = fs::metadata(&location).map_err(|err| map_io(err, &location, logical))?;
        if !metadata.is_dir() {
            return Err(StoreError::NotFound(folder_id_for_path(logical)));
        }
        let mut folder = VaultEntry::folder(folder_id_for_path(logical), logical, file_name(logical));
        folder.children = self.read_dir_recursive(logical, &location);
        Ok(folder)
    }

    /// Lists one directory, recursing into subfolders.
    ///
    /// Per-entry failures are logged and skipped.
    fn read_dir_recursive(&self, logical_dir: &str, location: &Path) -> Vec<VaultEntry> {
        let reader = match fs::read_dir(location) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(
                    "event=fs_list_dir module=store backend=hierarchical status=skipped error={err}"
                );
                return Vec::new();
            }
        };

        let mut items = Vec::new();
        for dir_entry in reader {
            let dir_entry = match dir_entry {
                Ok(dir_entry) => dir_entry,
                Err(err) => {
                    warn!(
                        "event=fs_list_entry module=store backend=hierarchical status=skipped error={err}"
                    );
                    continue;
                }
            };

            let Some(name) = dir_entry.file_name().to_str().map(str::to_string) else {
                warn!(
                    "event=fs_list_entry module=store backend=hierarchical status=skipped reason=non_utf8_name"
                );
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            let file_type = match dir_entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(
                        "event=fs_list_entry module=store backend=hierarchical status=skipped error={err}"
                    );
                    continue;
                }
            };

            let logical = join_path(logical_dir, &name);
            if file_type.is_dir() {
                let mut folder = VaultEntry::folder(folder_id_for_path(&logical), &logical, &name);
                folder.children = self.read_dir_recursive(&logical, &dir_entry.path());
                items.push(folder);
            } else if name.ends_with(NOTE_EXTENSION) {
                match fs::read_to_string(dir_entry.path()) {
                    Ok(content) => items.push(VaultEntry::note(
                        file_id_for_path(&logical),
                        &logical,
                        &name,
                        content,
                    )),
                    Err(err) => warn!(
                        "event=fs_list_entry module=store backend=hierarchical status=skipped error={err}"
                    ),
                }
            }
        }

        items.sort_by(|left, right| left.name.cmp(&right.name));
        items
    }

    fn journal_location(&self) -> PathBuf {
        self.root_dir().join(RENAME_JOURNAL_FILE)
    }

    fn load_journal(&self) -> StoreResult<Vec<PendingRename>> {
        let location = self.journal_location();
        let raw = match fs::read_to_string(&location) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(location, err)),
        };
        serde_json::from_str(&raw)
            .map_err(|err| StoreError::InvalidData(format!("rename journal: {err}")))
    }

    fn write_journal(&self, pending: &[PendingRename]) -> StoreResult<()> {
        let root = self.root_dir();
        fs::create_dir_all(&root).map_err(|err| StoreError::io(&root, err))?;
        let location = self.journal_location();
        if pending.is_empty() {
            return match fs::remove_file(&location) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StoreError::io(location, err)),
            };
        }
        let raw = serde_json::to_string_pretty(pending)
            .map_err(|err| StoreError::InvalidData(format!("rename journal: {err}")))?;
        fs::write(&location, raw).map_err(|err| StoreError::io(location, err))
    }
}

impl NoteStore for FsNoteStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Hierarchical
    }

    fn create(&self, entry: &VaultEntry) -> StoreResult<VaultEntry> {
        validate_entry_location(entry)?;
        if entry.is_directory {
            return self.create_container(parent_path(&entry.path), &entry.name);
        }
        if !entry.name.ends_with(NOTE_EXTENSION) {
            return Err(StoreError::InvalidName(entry.name.clone()));
        }

        let location = self.resolve(&entry.path)?;
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&location)
            .map_err(|err| map_io(err, &location, &entry.path))?;
        file.write_all(entry.content.as_bytes())
            .map_err(|err| StoreError::io(&location, err))?;

        debug!("event=store_create module=store backend=hierarchical status=ok is_directory=false");
        Ok(VaultEntry::note(
            file_id_for_path(&entry.path),
            &entry.path,
            &entry.name,
            &entry.content,
        ))
    }

    fn read(&self, id: &str) -> StoreResult<VaultEntry> {
        if let Some(logical) = id.strip_prefix(FOLDER_ID_PREFIX) {
            return self.read_folder(logical);
        }
        let logical = self.note_path_from_id(id)?;
        self.read_note(logical)
    }

    fn update(&self, entry: &VaultEntry) -> StoreResult<()> {
        if entry.is_directory {
            return Err(StoreError::Unimplemented("folder update on hierarchical storage"));
        }
        let logical = self.note_path_from_id(&entry.id)?;
        if logical != entry.path {
            return Err(StoreError::InvalidData(format!(
                "hierarchical entry `{}` cannot move to `{}` through update",
                entry.id, entry.path
            )));
        }

        let location = self.resolve(logical)?;
        if !location.is_file() {
            return Err(StoreError::NotFound(entry.id.clone()));
        }
        fs::write(&location, entry.content.as_bytes()).map_err(|err| StoreError::io(&location, err))
    }

    fn delete(&self, entry: &VaultEntry) -> StoreResult<()> {
        if entry.is_directory {
            let logical = entry
                .id
                .strip_prefix(FOLDER_ID_PREFIX)
                .unwrap_or(entry.path.as_str());
            let location = self.resolve(logical)?;
            if location == self.root_dir() {
                return Err(StoreError::InvalidName(logical.to_string()));
            }
            return fs::remove_dir_all(&location).map_err(|err| map_io(err, &location, &entry.id));
        }

        let logical = self.note_path_from_id(&entry.id)?;
        let location = self.resolve(logical)?;
        fs::remove_file(&location).map_err(|err| map_io(err, &location, &entry.id))
    }

    fn list_all(&self) -> StoreResult<StoreListing> {
        let root = self.root_dir();
        if !root.is_dir() {
            fs::create_dir_all(&root).map_err(|err| StoreError::io(&root, err))?;
            return Ok(StoreListing::Tree(Vec::new()));
        }
        Ok(StoreListing::Tree(
            self.read_dir_recursive(&self.root_segment, &root),
        ))
    }

    fn create_container(&self, parent_path: &str, name: &str) -> StoreResult<VaultEntry> {
        validate_entry_name(name)?;
        let logical = join_path(parent_path, name);
        let location = self.resolve(&logical)?;
        if location.exists() {
            return Err(StoreError::AlreadyExists(logical));
        }
        fs::create_dir_all(&location).map_err(|err| StoreError::io(&location, err))?;
        Ok(VaultEntry::folder(folder_id_for_path(&logical), &logical, name))
    }

    fn journal_rename(&self, rename: &PendingRename) -> StoreResult<()> {
        let mut pending = self.load_journal()?;
        pending.retain(|item| item.entry_id != rename.entry_id);
        pending.push(rename.clone());
        self.write_journal(&pending)
    }

    fn pending_renames(&self) -> StoreResult<Vec<PendingRename>> {
        self.load_journal()
    }

    fn clear_rename(&self, entry_id: &str) -> StoreResult<()> {
        let mut pending = self.load_journal()?;
        let before = pending.len();
        pending.retain(|item| item.entry_id != entry_id);
        if pending.len() == before {
            return Ok(());
        }
        self.write_journal(&pending)
    }
}

fn map_io(err: std::io::Error, location: &Path, key: &str) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
        ErrorKind::AlreadyExists => StoreError::AlreadyExists(key.to_string()),
        _ => StoreError::io(location, err),
    }
}
