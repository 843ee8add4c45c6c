use nexusnote_core::vault::tree::{find_by_id, find_by_path, notes};
use nexusnote_core::{
    BackendKind, BackendSelection, FsNoteStore, PendingRename, ReconstructMode, SqliteNoteStore,
    Vault, VaultConfig, VaultEntry, VaultError,
};

fn flat_vault(mode: ReconstructMode) -> Vault {
    let store = SqliteNoteStore::open_in_memory().unwrap();
    Vault::new(Box::new(store), "nexusnote", mode)
}

/// Runs `check` once per backend with a fresh, empty vault.
fn for_each_backend(check: impl Fn(&Vault)) {
    check(&flat_vault(ReconstructMode::SingleLevel));

    let dir = tempfile::tempdir().unwrap();
    let store = FsNoteStore::new(dir.path(), "nexusnote").unwrap();
    check(&Vault::new(
        Box::new(store),
        "nexusnote",
        ReconstructMode::SingleLevel,
    ));
}

fn write_note(vault: &Vault, title: &str, folder: Option<&str>, content: &str) -> VaultEntry {
    let mut note = vault.create_note(title, folder).unwrap();
    note.content = content.to_string();
    vault.save(&note).unwrap();
    note
}

#[test]
fn created_note_reads_back_content_equal() {
    for_each_backend(|vault| {
        let raw = VaultEntry::note("", "nexusnote/Raw.md", "Raw.md", "body text");
        let created = vault.create(&raw).unwrap();
        let loaded = vault.get_one(&created.id).unwrap();
        assert_eq!(loaded.content, "body text");
        assert_eq!(loaded.path, "nexusnote/Raw.md");

        let saved = write_note(vault, "Ideas", None, "# Ideas\n");
        assert_eq!(saved.name, "Ideas.md");
        assert_eq!(vault.get_one(&saved.id).unwrap().content, "# Ideas\n");
    });
}

#[test]
fn get_one_missing_id_is_not_found() {
    for_each_backend(|vault| {
        assert!(matches!(
            vault.get_one("file-nexusnote/Nope.md"),
            Err(VaultError::NotFound(_))
        ));
    });
}

#[test]
fn dot_leading_names_are_rejected_on_every_backend() {
    for_each_backend(|vault| {
        assert!(matches!(
            vault.create_note(".plan", None),
            Err(VaultError::InvalidName(_))
        ));
        assert!(matches!(
            vault.create_folder(None, ".archive"),
            Err(VaultError::InvalidName(_))
        ));

        let plan = write_note(vault, "Plan", None, "");
        assert!(matches!(
            vault.rename(&plan, ".plan"),
            Err(VaultError::InvalidName(_))
        ));

        let tree = vault.get_all().unwrap();
        assert_eq!(notes(&tree).len(), 1);
        assert_eq!(notes(&tree)[0].id, plan.id);
    });
}

#[test]
fn create_note_targets_explicit_folder() {
    for_each_backend(|vault| {
        let task = vault.create_note("Task", Some("Work")).unwrap();
        assert_eq!(task.path, "nexusnote/Work/Task.md");

        let tree = vault.get_all().unwrap();
        let work = find_by_path(&tree, "nexusnote/Work").unwrap();
        assert!(work.is_directory);
        assert_eq!(work.children.len(), 1);
        assert_eq!(work.children[0].id, task.id);
    });
}

#[test]
fn tree_has_no_duplicate_ids() {
    for_each_backend(|vault| {
        vault.create_folder(None, "Work").unwrap();
        write_note(vault, "A", Some("Work"), "");
        write_note(vault, "B", Some("Work"), "");
        write_note(vault, "Root", None, "");

        let tree = vault.get_all().unwrap();
        let mut ids = Vec::new();
        nexusnote_core::vault::tree::walk(&tree, &mut |entry: &VaultEntry, _| {
            ids.push(entry.id.clone())
        });
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 4);
    });
}

#[test]
fn deleted_note_leaves_tree_and_graph() {
    for_each_backend(|vault| {
        write_note(vault, "A", None, "see [[B]]");
        let b = write_note(vault, "B", None, "");
        assert_eq!(vault.build_graph().unwrap().edges.len(), 1);

        vault.delete(&b).unwrap();

        let tree = vault.get_all().unwrap();
        assert!(find_by_id(&tree, &b.id).is_none());
        let graph = vault.build_graph().unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    });
}

#[test]
fn rename_moves_content_and_drops_old_path() {
    for_each_backend(|vault| {
        let draft = write_note(vault, "Draft", None, "keep me");
        let renamed = vault.rename(&draft, "Final").unwrap();

        assert_eq!(renamed.name, "Final.md");
        assert_eq!(renamed.path, "nexusnote/Final.md");
        assert_eq!(vault.get_one(&renamed.id).unwrap().content, "keep me");

        let tree = vault.get_all().unwrap();
        assert!(find_by_path(&tree, "nexusnote/Draft.md").is_none());
        assert_eq!(notes(&tree).len(), 1);
        assert!(vault.store().pending_renames().unwrap().is_empty());

        if vault.backend() == BackendKind::Flat {
            assert_eq!(renamed.id, draft.id);
        }
    });
}

#[test]
fn rename_onto_existing_entry_never_merges() {
    for_each_backend(|vault| {
        let a = write_note(vault, "A", None, "alpha");
        let b = write_note(vault, "B", None, "beta");

        let err = vault.rename(&a, "B").unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists(_)));

        assert_eq!(vault.get_one(&a.id).unwrap().content, "alpha");
        assert_eq!(vault.get_one(&b.id).unwrap().content, "beta");
        assert_eq!(notes(&vault.get_all().unwrap()).len(), 2);
    });
}

#[test]
fn folder_rename_is_unimplemented_on_hierarchical_storage() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsNoteStore::new(dir.path(), "nexusnote").unwrap();
    let vault = Vault::new(Box::new(store), "nexusnote", ReconstructMode::SingleLevel);
    let folder = vault.create_folder(None, "Work").unwrap();

    assert!(matches!(
        vault.rename(&folder, "Job"),
        Err(VaultError::Unimplemented(_))
    ));
    assert!(dir.path().join("nexusnote/Work").is_dir());
}

#[test]
fn folder_rename_on_flat_storage_repaths_descendants() {
    let vault = flat_vault(ReconstructMode::SingleLevel);
    let folder = vault.create_folder(None, "Work").unwrap();
    let note = write_note(&vault, "A", Some("Work"), "inside");

    let renamed = vault.rename(&folder, "Job").unwrap();
    assert_eq!(renamed.id, folder.id);
    assert_eq!(renamed.path, "nexusnote/Job");

    let tree = vault.get_all().unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].name, "Job");
    assert_eq!(tree[0].children[0].id, note.id);
    assert_eq!(tree[0].children[0].path, "nexusnote/Job/A.md");
}

#[test]
fn synthesized_folder_can_be_read_and_renamed() {
    let vault = flat_vault(ReconstructMode::SingleLevel);
    let note = write_note(&vault, "A", Some("Inbox"), "");

    let inbox = vault.get_one("dir-nexusnote/Inbox").unwrap();
    assert!(inbox.is_directory);
    assert_eq!(inbox.children[0].id, note.id);

    let archive = vault.rename(&inbox, "Archive").unwrap();
    assert_eq!(archive.id, "dir-nexusnote/Archive");
    let moved = vault.get_one(&note.id).unwrap();
    assert_eq!(moved.path, "nexusnote/Archive/A.md");
}

#[test]
fn nested_mode_rebuilds_deep_folders() {
    let vault = flat_vault(ReconstructMode::Nested);
    write_note(&vault, "Deep", Some("Work/Projects"), "");

    let tree = vault.get_all().unwrap();
    assert_eq!(tree.len(), 1);
    let projects = &tree[0].children[0];
    assert_eq!(projects.path, "nexusnote/Work/Projects");
    assert_eq!(projects.children[0].name, "Deep.md");
}

#[test]
fn open_or_create_by_name_resolves_then_creates() {
    for_each_backend(|vault| {
        let existing = write_note(vault, "Rust Notes", Some("Dev"), "x");
        let resolved = vault.open_or_create_by_name("rust notes").unwrap();
        assert_eq!(resolved.id, existing.id);

        let created = vault.open_or_create_by_name("Fresh Idea").unwrap();
        assert_eq!(created.path, "nexusnote/Fresh Idea.md");
        assert_eq!(created.content, "# Fresh Idea\n\n");
        assert_eq!(notes(&vault.get_all().unwrap()).len(), 2);
    });
}

#[test]
fn reconcile_removes_identical_duplicate_from_interrupted_rename() {
    for_each_backend(|vault| {
        let old = write_note(vault, "Old", None, "same body");
        let new = write_note(vault, "New", None, "same body");
        vault
            .store()
            .journal_rename(&PendingRename {
                entry_id: old.id.clone(),
                old_path: old.path.clone(),
                new_path: new.path.clone(),
            })
            .unwrap();

        let report = vault.reconcile().unwrap();
        assert_eq!(report.resolved.len(), 1);

        let tree = vault.get_all().unwrap();
        assert!(find_by_path(&tree, &old.path).is_none());
        assert!(find_by_path(&tree, &new.path).is_some());
        assert!(vault.store().pending_renames().unwrap().is_empty());
    });
}

#[test]
fn reconcile_keeps_both_copies_when_contents_diverge() {
    for_each_backend(|vault| {
        let old = write_note(vault, "Old", None, "edited later");
        let new = write_note(vault, "New", None, "original");
        vault
            .store()
            .journal_rename(&PendingRename {
                entry_id: old.id.clone(),
                old_path: old.path.clone(),
                new_path: new.path.clone(),
            })
            .unwrap();

        let report = vault.reconcile().unwrap();
        assert_eq!(report.conflicts.len(), 1);
        assert!(report.resolved.is_empty());
        assert_eq!(notes(&vault.get_all().unwrap()).len(), 2);
        assert!(vault.store().pending_renames().unwrap().is_empty());
    });
}

#[test]
fn derived_views_follow_current_content() {
    for_each_backend(|vault| {
        let a = write_note(
            vault,
            "A",
            None,
            "# Alpha\nIntro #rust\nsee [[B]] here\n## Sub Part #db",
        );
        let b = write_note(vault, "B", None, "#rust only");

        let backlinks = vault.backlinks("b").unwrap();
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].from, a.path);
        assert_eq!(backlinks[0].context, "see [[B]] here");

        let headings = vault.headings(&a.id).unwrap();
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[1].level, 2);
        assert_eq!(headings[1].slug, "sub-part-db");

        let tags = vault.tags().unwrap();
        assert_eq!(tags["rust"], vec![a.id.clone(), b.id.clone()]);
        assert_eq!(tags["db"], vec![a.id.clone()]);

        let stats = vault.stats().unwrap();
        assert_eq!(stats.total_notes, 2);
        assert_eq!(stats.total_links, 1);
        assert_eq!(stats.most_linked[0].id, a.id);

        let corpus = vault.corpus().unwrap();
        assert_eq!(corpus.len(), 2);
    });
}

#[test]
fn open_selects_backend_from_config() {
    let dir = tempfile::tempdir().unwrap();

    let flat = VaultConfig {
        backend: BackendSelection::Flat,
        data_dir: dir.path().join("flat"),
        ..VaultConfig::default()
    };
    let vault = Vault::open(&flat).unwrap();
    assert_eq!(vault.backend(), BackendKind::Flat);
    vault.create_note("Persisted", None).unwrap();
    drop(vault);
    let reopened = Vault::open(&flat).unwrap();
    assert_eq!(notes(&reopened.get_all().unwrap()).len(), 1);
    assert!(dir.path().join("flat/nexusnote.sqlite3").is_file());

    let files = VaultConfig {
        backend: BackendSelection::Hierarchical,
        data_dir: dir.path().join("files"),
        nested_folders: true,
        ..VaultConfig::default()
    };
    let vault = Vault::open(&files).unwrap();
    assert_eq!(vault.backend(), BackendKind::Hierarchical);
    assert_eq!(vault.mode(), ReconstructMode::Nested);
    vault.create_note("On Disk", None).unwrap();
    assert!(dir.path().join("files/nexusnote/On Disk.md").is_file());
}
