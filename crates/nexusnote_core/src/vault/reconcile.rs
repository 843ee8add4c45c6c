//! Start-up recovery for interrupted renames.
//!
//! A note rename writes the new note before deleting the old one. When the
//! process stops in between, both paths exist and the journal still holds
//! the intent. Reconciliation settles every journaled rename:
//!
//! - both paths present, same content: the old note is deleted;
//! - both paths present, different content: both are kept and a warning is
//!   logged (edits may have landed on either copy);
//! - otherwise the rename either finished or never started.
//!
//! The journal entry is cleared in every case.

use super::{tree, Vault, VaultResult};
use crate::store::PendingRename;
use log::{info, warn};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Duplicates removed.
    pub resolved: Vec<PendingRename>,
    /// Duplicates kept because their contents diverged.
    pub conflicts: Vec<PendingRename>,
    /// Journal entries with nothing left to repair.
    pub settled: Vec<PendingRename>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.conflicts.is_empty() && self.settled.is_empty()
    }
}

impl Vault {
    /// Settles every journaled rename.
    pub fn reconcile(&self) -> VaultResult<ReconcileReport> {
        let pending = self.store.pending_renames()?;
        let mut report = ReconcileReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        for rename in pending {
            let tree = self.get_all()?;
            let old = tree::find_by_path(&tree, &rename.old_path).filter(|entry| entry.is_note());
            let new = tree::find_by_path(&tree, &rename.new_path).filter(|entry| entry.is_note());

            match (old, new) {
                (Some(old), Some(new)) if old.content == new.content => {
                    let old = old.clone();
                    self.store.delete(&old)?;
                    report.resolved.push(rename.clone());
                }
                (Some(_), Some(_)) => {
                    warn!(
                        "event=vault_reconcile module=vault status=conflict reason=content_diverged"
                    );
                    report.conflicts.push(rename.clone());
                }
                _ => report.settled.push(rename.clone()),
            }
            self.store.clear_rename(&rename.entry_id)?;
        }

        info!(
            "event=vault_reconcile module=vault status=ok resolved={} conflicts={} settled={}",
            report.resolved.len(),
            report.conflicts.len(),
            report.settled.len()
        );
        Ok(report)
    }
}
