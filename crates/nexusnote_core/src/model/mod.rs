//! Vault domain model shared by every storage backend.
//!
//! # Responsibility
//! - Define the single entry shape used for notes and folders.
//! - Keep backend-specific identity rules out of callers.
//!
//! # Invariants
//! - An `EntryId` is opaque and stable for the lifetime of one entry.
//! - A child path is always `parent.path + "/" + child.name`.
//! - Notes never carry children; folders never carry content.

pub mod entry;
