//! Vault database bootstrap for the flat record backend.
//!
//! # Responsibility
//! - Open the vault database file (or an in-memory vault) and migrate it.
//! - Verify that a handed-in connection carries the vault schema before the
//!   record store touches it.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No entry row is read or written before `verify_vault_schema` passes.
//! - Open failures name the database file that could not be opened.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use migrations::verify_vault_schema;
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Vault database failure.
#[derive(Debug)]
pub enum DbError {
    /// The vault database file could not be opened or created.
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    /// Statement-level SQLite fault.
    Sqlite(rusqlite::Error),
    /// The file was migrated by a newer build.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The connection is not at the schema version this build writes.
    SchemaNotReady { expected: u32, actual: u32 },
    /// A vault table is absent despite a matching version.
    MissingTable(&'static str),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "cannot open vault database `{}`: {source}", path.display())
            }
            Self::Sqlite(err) => write!(f, "vault database error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "vault schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaNotReady { expected, actual } => write!(
                f,
                "vault database is at schema version {actual}, expected {expected}"
            ),
            Self::MissingTable(table) => write!(f, "vault database lacks table `{table}`"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
