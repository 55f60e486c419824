//! Reconciliation planning
//!
//! Compares desired keys, the ledger, a registry snapshot and current content
//! fingerprints, and decides what each phase must do. Planning reads but never
//! mutates, which is what makes dry runs possible.

use crate::content::{ContentIdentifier, ContentSource};
use crate::emote::RemoteId;
use crate::error::SyncError;
use crate::ledger::{Ledger, LedgerEntry};
use crate::registry::Snapshot;
use serde::Serialize;
use std::collections::HashSet;

/// A desired key with no ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddAction {
    pub key: String,
    /// Untracked remote resources already using the key's name; deleted before upload.
    pub orphans: Vec<RemoteId>,
}

/// A tracked key whose content fingerprint no longer matches the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateAction {
    pub key: String,
    pub remote_id: RemoteId,
    #[serde(with = "crate::ledger::hex_bytes")]
    pub stored: ContentIdentifier,
    #[serde(with = "crate::ledger::hex_bytes")]
    pub current: ContentIdentifier,
}

/// Work for one reconciliation pass, in phase order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    /// Entries whose remote resource is already gone; dropped without a remote call.
    pub prune: Vec<LedgerEntry>,
    /// Entries for keys that are no longer desired.
    pub remove: Vec<LedgerEntry>,
    pub add: Vec<AddAction>,
    pub update: Vec<UpdateAction>,
}

impl ReconcilePlan {
    /// Build the plan for `desired_keys` (in registration order)
    ///
    /// Fingerprints are computed for every surviving desired entry; a content
    /// error here is fatal because nothing has been mutated yet.
    pub async fn build(
        desired_keys: &[String],
        ledger: &Ledger,
        snapshot: &Snapshot,
        content: &dyn ContentSource,
    ) -> Result<Self, SyncError> {
        let desired: HashSet<&str> = desired_keys.iter().map(String::as_str).collect();
        let mut plan = ReconcilePlan::default();
        let mut surviving: Vec<&LedgerEntry> = Vec::new();

        for entry in ledger {
            if snapshot.contains_id(entry.remote_id) {
                surviving.push(entry);
            } else {
                plan.prune.push(entry.clone());
            }
        }

        let tracked_ids: HashSet<RemoteId> = surviving.iter().map(|e| e.remote_id).collect();

        for entry in &surviving {
            if !desired.contains(entry.key.as_str()) {
                plan.remove.push((*entry).clone());
            }
        }

        for key in desired_keys {
            if surviving.iter().any(|e| e.key == *key) {
                continue;
            }
            let orphans = snapshot
                .named(key)
                .map(|r| r.id)
                .filter(|id| !tracked_ids.contains(id))
                .collect();
            plan.add.push(AddAction {
                key: key.clone(),
                orphans,
            });
        }

        for entry in surviving {
            if !desired.contains(entry.key.as_str()) {
                continue;
            }
            let current = content
                .fingerprint(&entry.key)
                .await
                .map_err(|source| SyncError::Content {
                    key: entry.key.clone(),
                    source,
                })?;
            if current != entry.content_identifier {
                plan.update.push(UpdateAction {
                    key: entry.key.clone(),
                    remote_id: entry.remote_id,
                    stored: entry.content_identifier.clone(),
                    current,
                });
            }
        }

        Ok(plan)
    }

    /// True when the pass would change nothing
    pub fn is_empty(&self) -> bool {
        self.prune.is_empty()
            && self.remove.is_empty()
            && self.add.is_empty()
            && self.update.is_empty()
    }

    /// Upper bound on mutating registry calls this plan issues
    pub fn registry_call_estimate(&self) -> usize {
        self.remove.len()
            + self
                .add
                .iter()
                .map(|a| a.orphans.len() + 1)
                .sum::<usize>()
            + self.update.len() * 2
    }
}
