//! Vault entry model.
//!
//! # Responsibility
//! - Define `VaultEntry`, the note/folder record exposed by the vault.
//! - Provide path and display-name helpers used across layers.
//!
//! # Invariants
//! - `is_directory == false` implies `children` is empty.
//! - `is_directory == true` implies `content` is empty.
//! - `children` never contains two entries with the same `id`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, backend-assigned identifier.
///
/// Flat storage assigns random ids; hierarchical storage derives ids from
/// paths (`file-<path>` / `dir-<path>`).
pub type EntryId = String;

/// File extension used by every note.
pub const NOTE_EXTENSION: &str = ".md";

/// Id prefix for folders whose id is derived from their path.
pub const FOLDER_ID_PREFIX: &str = "dir-";

/// Id prefix for notes whose id is derived from their path.
pub const FILE_ID_PREFIX: &str = "file-";

/// One note or folder in the vault tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
    /// Stable identifier; unique across the whole tree.
    pub id: EntryId,
    /// Slash-delimited logical location, starting with the vault root segment.
    pub path: String,
    /// Display name; notes keep their `.md` extension here.
    pub name: String,
    /// Raw markdown body. Always empty for folders.
    pub content: String,
    /// Folder flag.
    pub is_directory: bool,
    /// Child entries. Only populated for folders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<VaultEntry>,
}

impl VaultEntry {
    /// Creates a note entry.
    pub fn note(
        id: impl Into<EntryId>,
        path: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            name: name.into(),
            content: content.into(),
            is_directory: false,
            children: Vec::new(),
        }
    }

    /// Creates an empty folder entry.
    pub fn folder(id: impl Into<EntryId>, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            name: name.into(),
            content: String::new(),
            is_directory: true,
            children: Vec::new(),
        }
    }

    /// Creates a folder whose id is derived from its path.
    ///
    /// Used for folders inferred during hierarchy reconstruction so that
    /// repeated reconstructions produce the same id.
    pub fn synthesized_folder(path: impl Into<String>, name: impl Into<String>) -> Self {
        let path = path.into();
        Self::folder(folder_id_for_path(&path), path, name)
    }

    /// Returns whether this entry is a note.
    pub fn is_note(&self) -> bool {
        !self.is_directory
    }

    /// Note name with the `.md` extension stripped.
    pub fn display_name(&self) -> &str {
        display_name(&self.name)
    }

    /// Path of the containing folder (or the root segment).
    pub fn parent_path(&self) -> &str {
        parent_path(&self.path)
    }

    /// Adds a child unless an entry with the same id is already attached.
    ///
    /// Returns `true` when the child was inserted.
    pub fn attach_child(&mut self, child: VaultEntry) -> bool {
        if self.children.iter().any(|existing| existing.id == child.id) {
            return false;
        }
        self.children.push(child);
        true
    }

    /// Clone of this entry without its children.
    pub fn shallow(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }
}

/// Generates a fresh opaque id for flat storage.
pub fn generate_entry_id() -> EntryId {
    Uuid::new_v4().to_string()
}

/// Strips a trailing `.md` extension from a note name.
pub fn display_name(name: &str) -> &str {
    name.strip_suffix(NOTE_EXTENSION).unwrap_or(name)
}

/// Joins a parent path and a child name with one slash.
pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        return name.to_string();
    }
    format!("{parent}/{name}")
}

/// Returns everything before the last slash, or `""` for a bare name.
pub fn parent_path(path: &str) -> &str {
    path.rfind('/').map_or("", |index| &path[..index])
}

/// Returns the last path segment.
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map_or(path, |index| &path[index + 1..])
}

/// Derived id for a folder at `path`.
pub fn folder_id_for_path(path: &str) -> EntryId {
    format!("{FOLDER_ID_PREFIX}{path}")
}

/// Derived id for a note at `path`.
pub fn file_id_for_path(path: &str) -> EntryId {
    format!("{FILE_ID_PREFIX}{path}")
}

/// Turns a free-form title into a storable note name.
///
/// Removes `<>:"/\|?*`, collapses whitespace runs and appends `.md` when the
/// title does not already end with it. Returns `None` for blank results.
pub fn note_file_name(title: &str) -> Option<String> {
    let cleaned = title
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect::<String>();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || display_name(&collapsed).trim().is_empty() {
        return None;
    }
    if collapsed.ends_with(NOTE_EXTENSION) {
        return Some(collapsed);
    }
    Some(format!("{collapsed}{NOTE_EXTENSION}"))
}
