//! Reconciliation
//!
//! Applies a [`ReconcilePlan`] against the registry and the ledger in four
//! strictly ordered phases: prune, remove, add, update. Prune runs first so no
//! later phase acts on a remote id that is already gone; remove runs before add
//! so a key swap within one pass never leaves two resources with one name.
//!
//! Keys are processed one at a time. A registry failure on one key is recorded
//! and the pass moves on to the next key.

use crate::content::{read_content, ContentIdentifier, ContentSource};
use crate::emote::RemoteId;
use crate::error::{RegistryError, SyncError};
use crate::ledger::{Ledger, LedgerEntry};
use crate::registry::{RegistryClient, RegistryOperation};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument, warn};

pub mod plan;

pub use plan::{AddAction, ReconcilePlan, UpdateAction};

/// Reconciliation phase a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    Remove,
    Add,
    Update,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcilePhase::Remove => "remove",
            ReconcilePhase::Add => "add",
            ReconcilePhase::Update => "update",
        };
        f.write_str(name)
    }
}

/// A key that could not be reconciled this pass; retried on the next run
#[derive(Debug)]
pub struct KeyFailure {
    pub key: String,
    pub phase: ReconcilePhase,
    pub error: SyncError,
}

/// What one pass actually did
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub pruned: Vec<String>,
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub failures: Vec<KeyFailure>,
}

impl ReconcileOutcome {
    pub fn failed_keys(&self) -> HashSet<&str> {
        self.failures.iter().map(|f| f.key.as_str()).collect()
    }
}

/// Applies plans against one content store and one registry
///
/// Not safe to run concurrently against the same ledger and registry: two
/// passes can race on create/delete for the same key. Callers serialize runs.
pub struct Reconciler<'a> {
    content: &'a dyn ContentSource,
    registry: &'a dyn RegistryClient,
}

impl<'a> Reconciler<'a> {
    pub fn new(content: &'a dyn ContentSource, registry: &'a dyn RegistryClient) -> Self {
        Self { content, registry }
    }

    /// Run every phase of `plan`, mutating `ledger` in place
    #[instrument(skip_all, fields(
        prune = plan.prune.len(),
        remove = plan.remove.len(),
        add = plan.add.len(),
        update = plan.update.len(),
    ))]
    pub async fn apply(&self, plan: ReconcilePlan, ledger: &mut Ledger) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();

        self.prune(&plan.prune, ledger, &mut outcome);
        self.remove(&plan.remove, ledger, &mut outcome).await;
        self.add(&plan.add, ledger, &mut outcome).await;
        self.update(&plan.update, ledger, &mut outcome).await;

        info!(
            pruned = outcome.pruned.len(),
            removed = outcome.removed.len(),
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            failed = outcome.failures.len(),
            "Reconciliation pass completed"
        );
        outcome
    }

    fn prune(&self, entries: &[LedgerEntry], ledger: &mut Ledger, outcome: &mut ReconcileOutcome) {
        for entry in entries {
            if ledger.remove(&entry.key).is_some() {
                info!(
                    key = %entry.key,
                    remote_id = entry.remote_id,
                    "Pruned ledger entry missing from registry"
                );
                outcome.pruned.push(entry.key.clone());
            }
        }
    }

    async fn remove(
        &self,
        entries: &[LedgerEntry],
        ledger: &mut Ledger,
        outcome: &mut ReconcileOutcome,
    ) {
        for entry in entries {
            match self.delete(&entry.key, entry.remote_id).await {
                Ok(()) => {
                    ledger.remove(&entry.key);
                    info!(key = %entry.key, remote_id = entry.remote_id, "Removed obsolete emote");
                    outcome.removed.push(entry.key.clone());
                }
                Err(error) => record_failure(outcome, &entry.key, ReconcilePhase::Remove, error),
            }
        }
    }

    async fn add(
        &self,
        actions: &[AddAction],
        ledger: &mut Ledger,
        outcome: &mut ReconcileOutcome,
    ) {
        for action in actions {
            match self.add_one(action).await {
                Ok(entry) => {
                    info!(
                        key = %entry.key,
                        remote_id = entry.remote_id,
                        fingerprint = %hex::encode(&entry.content_identifier),
                        "Added emote"
                    );
                    outcome.added.push(entry.key.clone());
                    ledger.upsert(entry);
                }
                Err(error) => record_failure(outcome, &action.key, ReconcilePhase::Add, error),
            }
        }
    }

    async fn add_one(&self, action: &AddAction) -> Result<LedgerEntry, SyncError> {
        let fingerprint = self.fingerprint(&action.key).await?;
        let content = self.read(&action.key).await?;
        for orphan in &action.orphans {
            debug!(
                key = %action.key,
                remote_id = orphan,
                "Deleting untracked emote with same name"
            );
            self.delete(&action.key, *orphan).await?;
        }
        self.upload(&action.key, content, fingerprint).await
    }

    async fn update(
        &self,
        actions: &[UpdateAction],
        ledger: &mut Ledger,
        outcome: &mut ReconcileOutcome,
    ) {
        for action in actions {
            let content = match self.read(&action.key).await {
                Ok(content) => content,
                Err(error) => {
                    record_failure(outcome, &action.key, ReconcilePhase::Update, error);
                    continue;
                }
            };

            if let Err(error) = self.delete(&action.key, action.remote_id).await {
                record_failure(outcome, &action.key, ReconcilePhase::Update, error);
                continue;
            }

            match self.upload(&action.key, content, action.current.clone()).await {
                Ok(entry) => {
                    info!(
                        key = %entry.key,
                        previous_id = action.remote_id,
                        remote_id = entry.remote_id,
                        stored = %hex::encode(&action.stored),
                        fingerprint = %hex::encode(&entry.content_identifier),
                        "Replaced emote with changed content"
                    );
                    outcome.updated.push(entry.key.clone());
                    ledger.upsert(entry);
                }
                Err(error) => {
                    // The old resource is gone, so the entry no longer names anything remote.
                    ledger.remove(&action.key);
                    record_failure(outcome, &action.key, ReconcilePhase::Update, error);
                }
            }
        }
    }

    /// Delete a remote resource; one that is already gone counts as deleted.
    async fn delete(&self, key: &str, remote_id: RemoteId) -> Result<(), SyncError> {
        match self.registry.delete_resource(remote_id).await {
            Ok(()) | Err(RegistryError::NotFound(_)) => Ok(()),
            Err(source) => Err(SyncError::RegistryOperationFailed {
                op: RegistryOperation::Delete,
                key: Some(key.to_string()),
                source,
            }),
        }
    }

    async fn upload(
        &self,
        key: &str,
        content: Vec<u8>,
        fingerprint: ContentIdentifier,
    ) -> Result<LedgerEntry, SyncError> {
        let created = self
            .registry
            .create_resource(key, content)
            .await
            .map_err(|source| SyncError::RegistryOperationFailed {
                op: RegistryOperation::Create,
                key: Some(key.to_string()),
                source,
            })?;
        Ok(LedgerEntry {
            key: key.to_string(),
            remote_id: created.id,
            animated: created.animated,
            content_identifier: fingerprint,
        })
    }

    // Fingerprint before reading: an edit landing in between then shows up as a
    // mismatch on the next run instead of being recorded as current.
    async fn fingerprint(&self, key: &str) -> Result<ContentIdentifier, SyncError> {
        self.content
            .fingerprint(key)
            .await
            .map_err(|source| SyncError::Content {
                key: key.to_string(),
                source,
            })
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, SyncError> {
        read_content(self.content, key)
            .await
            .map_err(|source| SyncError::Content {
                key: key.to_string(),
                source,
            })
    }
}

fn record_failure(
    outcome: &mut ReconcileOutcome,
    key: &str,
    phase: ReconcilePhase,
    error: SyncError,
) {
    warn!(key = %key, phase = %phase, error = %error, "Failed to reconcile emote");
    outcome.failures.push(KeyFailure {
        key: key.to_string(),
        phase,
        error,
    });
}
