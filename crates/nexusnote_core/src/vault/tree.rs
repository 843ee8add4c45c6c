//! Tree traversal over resolved vault entries.
//!
//! Every lookup that walks nested children goes through this module; callers
//! never hand-roll their own recursion.
//!
//! # Invariants
//! - Traversal order is pre-order, children in stored order.
//! - Depth counts enclosing folders (root-level entries have depth 0).

use crate::model::entry::VaultEntry;

/// Visits every entry in pre-order with its folder depth.
pub fn walk<'a, F>(entries: &'a [VaultEntry], visit: &mut F)
where
    F: FnMut(&'a VaultEntry, usize),
{
    walk_at(entries, 0, visit);
}

fn walk_at<'a, F>(entries: &'a [VaultEntry], depth: usize, visit: &mut F)
where
    F: FnMut(&'a VaultEntry, usize),
{
    for entry in entries {
        visit(entry, depth);
        if entry.is_directory {
            walk_at(&entry.children, depth + 1, visit);
        }
    }
}

/// All notes (not folders) in pre-order, with their depth.
pub fn notes_with_depth(entries: &[VaultEntry]) -> Vec<(&VaultEntry, usize)> {
    let mut notes = Vec::new();
    walk(entries, &mut |entry, depth| {
        if entry.is_note() {
            notes.push((entry, depth));
        }
    });
    notes
}

/// All notes (not folders) in pre-order.
pub fn notes(entries: &[VaultEntry]) -> Vec<&VaultEntry> {
    notes_with_depth(entries)
        .into_iter()
        .map(|(entry, _)| entry)
        .collect()
}

/// Counts `(notes, folders)` in the tree.
pub fn count_entries(entries: &[VaultEntry]) -> (usize, usize) {
    let mut counts = (0, 0);
    walk(entries, &mut |entry, _| {
        if entry.is_directory {
            counts.1 += 1;
        } else {
            counts.0 += 1;
        }
    });
    counts
}

/// Finds the first entry matching `predicate` in pre-order.
pub fn find<'a, P>(entries: &'a [VaultEntry], predicate: &P) -> Option<&'a VaultEntry>
where
    P: Fn(&VaultEntry) -> bool,
{
    for entry in entries {
        if predicate(entry) {
            return Some(entry);
        }
        if let Some(found) = find(&entry.children, predicate) {
            return Some(found);
        }
    }
    None
}

/// Finds an entry by id anywhere in the tree.
pub fn find_by_id<'a>(entries: &'a [VaultEntry], id: &str) -> Option<&'a VaultEntry> {
    find(entries, &|entry| entry.id == id)
}

/// Finds an entry by logical path anywhere in the tree.
pub fn find_by_path<'a>(entries: &'a [VaultEntry], path: &str) -> Option<&'a VaultEntry> {
    find(entries, &|entry| entry.path == path)
}

/// Resolves a reference name to the first note whose display name matches
/// case-insensitively.
pub fn find_note_by_name<'a>(entries: &'a [VaultEntry], name: &str) -> Option<&'a VaultEntry> {
    let wanted = name.trim().to_lowercase();
    find(entries, &|entry| {
        entry.is_note() && entry.display_name().to_lowercase() == wanted
    })
}
