//! Flat record backend on SQLite.
//!
//! # Responsibility
//! - Persist one row per note/folder keyed by opaque id.
//! - Serve secondary lookups by logical path and by display name.
//!
//! # Invariants
//! - Paths are unique across all rows.
//! - `list_all` is ordered by `path ASC, id ASC` so reconstruction is
//!   deterministic.
//! - Deleting a folder row also deletes every row whose path lies below it.
//! - Materialized folders get opaque ids like notes; only reconstruction
//!   derives `dir-<path>` ids.

use crate::db::{open_db, open_db_in_memory, verify_vault_schema};
use crate::model::entry::{generate_entry_id, join_path, VaultEntry};
use crate::store::{
    validate_entry_location, validate_entry_name, BackendKind, NoteStore, PendingRename,
    StoreError, StoreListing, StoreResult,
};
use log::debug;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    path,
    name,
    content,
    is_directory
FROM entries";

/// SQLite-backed flat note store.
pub struct SqliteNoteStore {
    conn: Connection,
}

impl SqliteNoteStore {
    /// Wraps an already migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        verify_vault_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Opens the vault database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a throwaway in-memory vault.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Underlying connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Secondary lookup by logical path.
    pub fn find_by_path(&self, path: &str) -> StoreResult<Option<VaultEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE path = ?1;"))?;
        let mut rows = stmt.query([path])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }
        Ok(None)
    }

    /// Secondary lookup by stored name (exact, case-sensitive).
    ///
    /// Several folders may hold a note with the same name, so this returns
    /// every match ordered by path.
    pub fn find_by_name(&self, name: &str) -> StoreResult<Vec<VaultEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL} WHERE name = ?1 ORDER BY path ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([name])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(entries)
    }

    fn id_exists(&self, id: &str) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn path_owner(&self, path: &str) -> StoreResult<Option<String>> {
        let owner = self
            .conn
            .query_row("SELECT id FROM entries WHERE path = ?1;", [path], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(owner)
    }

    fn insert_entry(&self, entry: &VaultEntry) -> StoreResult<()> {
        if self.id_exists(&entry.id)? {
            return Err(StoreError::AlreadyExists(entry.id.clone()));
        }
        if self.path_owner(&entry.path)?.is_some() {
            return Err(StoreError::AlreadyExists(entry.path.clone()));
        }

        self.conn
            .execute(
                "INSERT INTO entries (id, path, name, content, is_directory)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    entry.id.as_str(),
                    entry.path.as_str(),
                    entry.name.as_str(),
                    entry.content.as_str(),
                    bool_to_int(entry.is_directory),
                ],
            )
            .map_err(|err| map_constraint(err, &entry.path))?;
        Ok(())
    }
}

impl NoteStore for SqliteNoteStore {
    fn backend(&self) -> BackendKind {
        BackendKind::Flat
    }

    fn create(&self, entry: &VaultEntry) -> StoreResult<VaultEntry> {
        validate_entry_location(entry)?;
        if entry.id.trim().is_empty() {
            return Err(StoreError::InvalidData("entry id must not be blank".to_string()));
        }

        let stored = VaultEntry {
            content: if entry.is_directory {
                String::new()
            } else {
                entry.content.clone()
            },
            ..entry.shallow()
        };
        self.insert_entry(&stored)?;
        debug!(
            "event=store_create module=store backend=flat status=ok is_directory={}",
            stored.is_directory
        );
        Ok(stored)
    }

    fn read(&self, id: &str) -> StoreResult<VaultEntry> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => parse_entry_row(row),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn update(&self, entry: &VaultEntry) -> StoreResult<()> {
        validate_entry_location(entry)?;
        if let Some(owner) = self.path_owner(&entry.path)? {
            if owner != entry.id {
                return Err(StoreError::AlreadyExists(entry.path.clone()));
            }
        }

        let content = if entry.is_directory {
            ""
        } else {
            entry.content.as_str()
        };
        let changed = self
            .conn
            .execute(
                "UPDATE entries
                 SET path = ?2,
                     name = ?3,
                     content = ?4,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1
                   AND is_directory = ?5;",
                params![
                    entry.id.as_str(),
                    entry.path.as_str(),
                    entry.name.as_str(),
                    content,
                    bool_to_int(entry.is_directory),
                ],
            )
            .map_err(|err| map_constraint(err, &entry.path))?;

        if changed == 0 {
            return Err(StoreError::NotFound(entry.id.clone()));
        }
        Ok(())
    }

    fn delete(&self, entry: &VaultEntry) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let mut removed = tx.execute("DELETE FROM entries WHERE id = ?1;", [entry.id.as_str()])?;

        if entry.is_directory {
            // Synthesized folders have no row of their own; their notes still go.
            let prefix = format!("{}/", entry.path);
            removed += tx.execute(
                "DELETE FROM entries
                 WHERE substr(path, 1, length(?1)) = ?1;",
                [prefix.as_str()],
            )?;
        }

        if removed == 0 {
            return Err(StoreError::NotFound(entry.id.clone()));
        }
        tx.commit()?;
        debug!("event=store_delete module=store backend=flat status=ok rows={removed}");
        Ok(())
    }

    fn list_all(&self) -> StoreResult<StoreListing> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} ORDER BY path ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }
        Ok(StoreListing::Flat(entries))
    }

    fn create_container(&self, parent_path: &str, name: &str) -> StoreResult<VaultEntry> {
        validate_entry_name(name)?;
        let path = join_path(parent_path, name);
        let folder = VaultEntry::folder(generate_entry_id(), path, name);
        self.insert_entry(&folder)?;
        Ok(folder)
    }

    fn journal_rename(&self, rename: &PendingRename) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO pending_renames (entry_id, old_path, new_path)
             VALUES (?1, ?2, ?3);",
            params![
                rename.entry_id.as_str(),
                rename.old_path.as_str(),
                rename.new_path.as_str(),
            ],
        )?;
        Ok(())
    }

    fn pending_renames(&self) -> StoreResult<Vec<PendingRename>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, old_path, new_path
             FROM pending_renames
             ORDER BY created_at ASC, entry_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut pending = Vec::new();
        while let Some(row) = rows.next()? {
            pending.push(PendingRename {
                entry_id: row.get(0)?,
                old_path: row.get(1)?,
                new_path: row.get(2)?,
            });
        }
        Ok(pending)
    }

    fn clear_rename(&self, entry_id: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM pending_renames WHERE entry_id = ?1;", [entry_id])?;
        Ok(())
    }
}

fn parse_entry_row(row: &Row<'_>) -> StoreResult<VaultEntry> {
    let is_directory = match row.get::<_, i64>("is_directory")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_directory value `{other}` in entries.is_directory"
            )));
        }
    };

    Ok(VaultEntry {
        id: row.get("id")?,
        path: row.get("path")?,
        name: row.get("name")?,
        content: row.get("content")?,
        is_directory,
        children: Vec::new(),
    })
}

fn map_constraint(err: rusqlite::Error, key: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::AlreadyExists(key.to_string())
        }
        _ => err.into(),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
