//! Emote synchronization entry point
//!
//! One run is a sequential pipeline: discover → validate content → bind immediate
//! emotes → snapshot the registry → reconcile → bind internal emotes. Discovery
//! and validation errors abort the run before anything is mutated.
//!
//! Runs against the same ledger and registry must not overlap. Taking the ledger
//! by `&mut` rules out overlap within one process for a given ledger value; other
//! processes sharing the registry need their own mutual exclusion.

use crate::binder::{bind_immediate, bind_internal};
use crate::content::ContentSource;
use crate::discovery::{discover, DesiredEmotes, Discovery};
use crate::error::SyncError;
use crate::ledger::Ledger;
use crate::reconcile::{KeyFailure, ReconcilePlan, Reconciler};
use crate::registry::{RegistryClient, RegistryOperation, Snapshot};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Summary of one synchronization run
#[derive(Debug, Default)]
pub struct SyncReport {
    pub pruned: Vec<String>,
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    /// Sinks invoked, immediate and internal
    pub bound_slots: usize,
    /// Keys left unbound because their reconciliation failed
    pub unbound_keys: Vec<String>,
    pub failures: Vec<KeyFailure>,
    /// Whether a registry snapshot was needed at all
    pub snapshot_fetched: bool,
}

impl SyncReport {
    /// True when every desired key is bound and the ledger fully converged
    pub fn is_converged(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of keys whose remote state changed
    pub fn change_count(&self) -> usize {
        self.removed.len() + self.added.len() + self.updated.len()
    }
}

/// Reconciles declared emotes against a content store and a registry
pub struct EmoteSynchronizer {
    content: Arc<dyn ContentSource>,
    registry: Arc<dyn RegistryClient>,
}

impl EmoteSynchronizer {
    pub fn new(content: Arc<dyn ContentSource>, registry: Arc<dyn RegistryClient>) -> Self {
        Self { content, registry }
    }

    /// Run discovery, reconciliation and binding for `desired`
    ///
    /// Returns `Err` for run-level failures. Per-key registry failures do not
    /// fail the run; they are listed in the report and retried next run.
    #[instrument(skip_all, fields(slots = desired.len(), ledger_entries = ledger.len()))]
    pub async fn synchronize(
        &self,
        desired: &DesiredEmotes,
        ledger: &mut Ledger,
    ) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        info!("Starting emote synchronization");

        let discovery = self.prepare(desired).await?;
        let mut report = SyncReport {
            bound_slots: bind_immediate(&discovery.immediate),
            ..SyncReport::default()
        };

        if discovery.internal.is_empty() && ledger.is_empty() {
            debug!("No internal emotes desired or tracked; skipping registry");
            return Ok(report);
        }

        let snapshot = self.snapshot().await?;
        report.snapshot_fetched = true;

        let plan = ReconcilePlan::build(
            &discovery.internal_keys(),
            ledger,
            &snapshot,
            self.content.as_ref(),
        )
        .await?;

        let outcome = Reconciler::new(self.content.as_ref(), self.registry.as_ref())
            .apply(plan, ledger)
            .await;

        let summary = bind_internal(&discovery.internal, ledger, &outcome.failed_keys())?;

        report.bound_slots += summary.bound_slots;
        report.unbound_keys = summary.unbound_keys;
        report.pruned = outcome.pruned;
        report.removed = outcome.removed;
        report.added = outcome.added;
        report.updated = outcome.updated;
        report.failures = outcome.failures;

        info!(
            bound_slots = report.bound_slots,
            changes = report.change_count(),
            failures = report.failures.len(),
            duration_ms = start.elapsed().as_millis(),
            "Emote synchronization completed"
        );
        Ok(report)
    }

    /// Compute what `synchronize` would do, without mutating anything or invoking sinks
    #[instrument(skip_all, fields(slots = desired.len(), ledger_entries = ledger.len()))]
    pub async fn plan(
        &self,
        desired: &DesiredEmotes,
        ledger: &Ledger,
    ) -> Result<ReconcilePlan, SyncError> {
        let discovery = self.prepare(desired).await?;
        if discovery.internal.is_empty() && ledger.is_empty() {
            return Ok(ReconcilePlan::default());
        }

        let snapshot = self.snapshot().await?;
        ReconcilePlan::build(
            &discovery.internal_keys(),
            ledger,
            &snapshot,
            self.content.as_ref(),
        )
        .await
    }

    async fn prepare(&self, desired: &DesiredEmotes) -> Result<Discovery, SyncError> {
        let discovery = discover(desired)?;
        debug!(
            immediate = discovery.immediate.len(),
            internal = discovery.internal.len(),
            "Discovered emote slots"
        );
        self.validate_content(&discovery).await?;
        Ok(discovery)
    }

    /// Every internal key must have content before anything remote is touched
    async fn validate_content(&self, discovery: &Discovery) -> Result<(), SyncError> {
        if discovery.internal.is_empty() {
            return Ok(());
        }
        let available = self
            .content
            .list_keys()
            .await
            .map_err(SyncError::ContentUnavailable)?;
        for mapping in &discovery.internal {
            if !available.contains(&mapping.key) {
                return Err(SyncError::ContentNotFound(mapping.key.clone()));
            }
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<Snapshot, SyncError> {
        let snapshot = Snapshot::fetch(self.registry.as_ref())
            .await
            .map_err(|source| SyncError::RegistryOperationFailed {
                op: RegistryOperation::List,
                key: None,
                source,
            })?;
        debug!(resources = snapshot.len(), "Fetched registry snapshot");
        Ok(snapshot)
    }
}
