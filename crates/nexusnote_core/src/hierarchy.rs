//! Folder tree reconstruction for flat record storage.
//!
//! # Responsibility
//! - Rebuild the implied folder/note tree from an unordered record set.
//! - Synthesize folders that notes imply but storage never materialized.
//!
//! # Invariants
//! - Output never contains the same id twice.
//! - Synthesized folders get `dir-<path>` ids, so reconstruction is
//!   idempotent over the same input.
//! - A folder is only ever a child of a strict path prefix, so no cycles.
//!
//! `ReconstructMode::SingleLevel` attaches every nested note to the folder
//! named by its first path segment and only roots one-segment folders;
//! deeper folder records are left out of the tree.
//! `ReconstructMode::Nested` walks every segment instead.

use crate::model::entry::{join_path, VaultEntry};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How far reconstruction follows folder segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructMode {
    /// One folder level below the root.
    #[default]
    SingleLevel,
    /// Arbitrary nesting; one folder per path segment.
    Nested,
}

enum RootSlot {
    Folder(usize),
    Note(VaultEntry),
}

#[derive(Default)]
struct Builder {
    root_segment: String,
    folders: Vec<VaultEntry>,
    folder_index: HashMap<String, usize>,
    subfolders: Vec<Vec<usize>>,
    attached: HashSet<usize>,
    roots: Vec<RootSlot>,
    seen_ids: HashSet<String>,
}

impl Builder {
    fn new(root_segment: &str) -> Self {
        Self {
            root_segment: root_segment.to_string(),
            ..Self::default()
        }
    }

    fn canonical_path(&self, segments: &[&str]) -> String {
        join_path(&self.root_segment, &segments.join("/"))
    }

    fn register_folder(&mut self, canonical: String, mut folder: VaultEntry) -> usize {
        if let Some(index) = self.folder_index.get(&canonical) {
            return *index;
        }
        folder.children.clear();
        folder.content.clear();
        let index = self.folders.len();
        self.folders.push(folder);
        self.subfolders.push(Vec::new());
        self.folder_index.insert(canonical, index);
        index
    }

    /// Returns the folder at `segments`, synthesizing it when unknown.
    fn folder_for(&mut self, segments: &[&str]) -> usize {
        let canonical = self.canonical_path(segments);
        if let Some(index) = self.folder_index.get(&canonical) {
            return *index;
        }
        let name = segments.last().copied().unwrap_or_default();
        let folder = VaultEntry::synthesized_folder(canonical.clone(), name);
        self.seen_ids.insert(folder.id.clone());
        debug!(
            "event=hierarchy_synthesize module=hierarchy status=ok depth={}",
            segments.len()
        );
        self.register_folder(canonical, folder)
    }

    fn root_folder(&mut self, index: usize) {
        if self.attached.insert(index) {
            self.roots.push(RootSlot::Folder(index));
        }
    }

    fn nest_folder(&mut self, parent: usize, child: usize) {
        if parent != child && self.attached.insert(child) {
            self.subfolders[parent].push(child);
        }
    }

    fn attach_note(&mut self, folder: Option<usize>, note: VaultEntry) {
        match folder {
            Some(index) => {
                self.folders[index].attach_child(note);
            }
            None => {
                let duplicate = self.roots.iter().any(|slot| match slot {
                    RootSlot::Note(existing) => existing.id == note.id,
                    RootSlot::Folder(_) => false,
                });
                if !duplicate {
                    self.roots.push(RootSlot::Note(note));
                }
            }
        }
    }

    /// Links the folder chain for `segments` and returns the deepest index.
    fn folder_chain(&mut self, segments: &[&str]) -> Option<usize> {
        let mut parent: Option<usize> = None;
        for depth in 1..=segments.len() {
            let index = self.folder_for(&segments[..depth]);
            match parent {
                Some(parent) => self.nest_folder(parent, index),
                None => self.root_folder(index),
            }
            parent = Some(index);
        }
        parent
    }

    fn assemble_folder(&mut self, index: usize) -> VaultEntry {
        let mut folder = std::mem::replace(
            &mut self.folders[index],
            VaultEntry::folder(String::new(), String::new(), String::new()),
        );
        let children = std::mem::take(&mut self.subfolders[index]);
        for child in children {
            let subtree = self.assemble_folder(child);
            folder.attach_child(subtree);
        }
        folder
    }

    fn finish(mut self) -> Vec<VaultEntry> {
        let roots = std::mem::take(&mut self.roots);
        roots
            .into_iter()
            .map(|slot| match slot {
                RootSlot::Folder(index) => self.assemble_folder(index),
                RootSlot::Note(note) => note,
            })
            .collect()
    }
}

/// Splits a logical path into segments below the vault root.
///
/// Empty segments and a leading root segment are dropped.
pub fn relative_segments<'a>(path: &'a str, root_segment: &str) -> Vec<&'a str> {
    let mut segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();
    if segments.first() == Some(&root_segment) {
        segments.remove(0);
    }
    segments
}

/// Rebuilds a tree of root-level entries from flat records.
pub fn reconstruct(
    records: Vec<VaultEntry>,
    root_segment: &str,
    mode: ReconstructMode,
) -> Vec<VaultEntry> {
    let mut builder = Builder::new(root_segment);
    let (directories, files): (Vec<_>, Vec<_>) =
        records.into_iter().partition(|record| record.is_directory);

    // Pre-seed every materialized folder.
    let mut directory_slots = Vec::with_capacity(directories.len());
    for directory in directories {
        if !builder.seen_ids.insert(directory.id.clone()) {
            continue;
        }
        let segments = relative_segments(&directory.path, root_segment)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let canonical = builder.canonical_path(&segments.iter().map(String::as_str).collect::<Vec<_>>());
        let index = builder.register_folder(canonical, directory);
        directory_slots.push((index, segments));
    }

    for file in files {
        if !builder.seen_ids.insert(file.id.clone()) {
            continue;
        }
        let path = file.path.clone();
        let segments = relative_segments(&path, root_segment);
        if segments.len() <= 1 {
            builder.attach_note(None, file);
            continue;
        }

        let parent = match mode {
            ReconstructMode::SingleLevel => {
                let index = builder.folder_for(&segments[..1]);
                builder.root_folder(index);
                Some(index)
            }
            ReconstructMode::Nested => builder.folder_chain(&segments[..segments.len() - 1]),
        };
        builder.attach_note(parent, file);
    }

    for (index, segments) in directory_slots {
        let segments = segments.iter().map(String::as_str).collect::<Vec<_>>();
        match (mode, segments.len()) {
            (_, 0) => {}
            (_, 1) => builder.root_folder(index),
            (ReconstructMode::SingleLevel, _) => {}
            (ReconstructMode::Nested, depth) => {
                if let Some(parent) = builder.folder_chain(&segments[..depth - 1]) {
                    builder.nest_folder(parent, index);
                }
            }
        }
    }

    builder.finish()
}

/// Flattens a tree back into shallow records (pre-order).
pub fn flatten(entries: &[VaultEntry]) -> Vec<VaultEntry> {
    let mut records = Vec::new();
    let mut stack = entries.iter().rev().collect::<Vec<_>>();
    while let Some(entry) = stack.pop() {
        records.push(entry.shallow());
        stack.extend(entry.children.iter().rev());
    }
    records
}

#[cfg(test)]
mod tests {
    use super::{flatten, reconstruct, relative_segments, ReconstructMode};
    use crate::model::entry::VaultEntry;

    fn note(id: &str, path: &str) -> VaultEntry {
        let name = path.rsplit('/').next().unwrap_or(path);
        VaultEntry::note(id, path, name, "")
    }

    #[test]
    fn relative_segments_drop_root_and_empty_parts() {
        assert_eq!(
            relative_segments("nexusnote//Work/Plan.md", "nexusnote"),
            vec!["Work", "Plan.md"]
        );
        assert_eq!(relative_segments("Plan.md", "nexusnote"), vec!["Plan.md"]);
    }

    #[test]
    fn root_notes_stay_at_root() {
        let tree = reconstruct(
            vec![note("a", "nexusnote/A.md"), note("b", "B.md")],
            "nexusnote",
            ReconstructMode::SingleLevel,
        );
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().all(|entry| !entry.is_directory));
    }

    #[test]
    fn missing_folder_is_synthesized_once() {
        let tree = reconstruct(
            vec![
                note("a", "nexusnote/Work/A.md"),
                note("b", "nexusnote/Work/B.md"),
            ],
            "nexusnote",
            ReconstructMode::SingleLevel,
        );
        assert_eq!(tree.len(), 1);
        let folder = &tree[0];
        assert!(folder.is_directory);
        assert_eq!(folder.id, "dir-nexusnote/Work");
        assert_eq!(folder.path, "nexusnote/Work");
        assert_eq!(folder.children.len(), 2);
    }

    #[test]
    fn materialized_empty_folder_becomes_root() {
        let tree = reconstruct(
            vec![VaultEntry::folder("f1", "nexusnote/Empty", "Empty")],
            "nexusnote",
            ReconstructMode::SingleLevel,
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "f1");
    }

    #[test]
    fn single_level_attaches_deep_notes_to_first_segment() {
        let tree = reconstruct(
            vec![
                note("deep", "nexusnote/A/B/C.md"),
                VaultEntry::folder("ab", "nexusnote/A/B", "B"),
            ],
            "nexusnote",
            ReconstructMode::SingleLevel,
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "nexusnote/A");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].id, "deep");
    }

    #[test]
    fn nested_mode_links_every_level() {
        let tree = reconstruct(
            vec![
                note("deep", "nexusnote/A/B/C.md"),
                VaultEntry::folder("ab", "nexusnote/A/B", "B"),
                VaultEntry::folder("x", "nexusnote/A/X", "X"),
            ],
            "nexusnote",
            ReconstructMode::Nested,
        );
        assert_eq!(tree.len(), 1);
        let a = &tree[0];
        assert_eq!(a.id, "dir-nexusnote/A");
        assert_eq!(a.children.len(), 2);
        let b = a.children.iter().find(|child| child.id == "ab").unwrap();
        assert_eq!(b.children.len(), 1);
        assert_eq!(b.children[0].id, "deep");
        assert!(a.children.iter().any(|child| child.id == "x"));
    }

    #[test]
    fn duplicate_records_are_dropped() {
        let tree = reconstruct(
            vec![note("a", "nexusnote/W/A.md"), note("a", "nexusnote/W/A.md")],
            "nexusnote",
            ReconstructMode::Nested,
        );
        assert_eq!(flatten(&tree).len(), 2);
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let records = vec![
            note("r", "nexusnote/Root.md"),
            note("a", "nexusnote/Work/A.md"),
            VaultEntry::folder("e", "nexusnote/Empty", "Empty"),
        ];
        for mode in [ReconstructMode::SingleLevel, ReconstructMode::Nested] {
            let first = reconstruct(records.clone(), "nexusnote", mode);
            let second = reconstruct(records.clone(), "nexusnote", mode);
            assert_eq!(first, second);
            let again = reconstruct(flatten(&first), "nexusnote", mode);
            assert_eq!(flatten(&again).len(), flatten(&first).len());
        }
    }
}
