//! Resolver/Binder: delivers handles to caller sinks.
//!
//! Immediate bindings are delivered as soon as discovery and validation pass.
//! Internal mappings are resolved from the reconciled ledger; every slot that
//! shares a key receives the same handle.

use crate::discovery::{ImmediateBinding, InternalMapping};
use crate::emote::Handle;
use crate::error::SyncError;
use crate::ledger::Ledger;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Result of binding internal mappings
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BindSummary {
    /// Number of sinks invoked
    pub bound_slots: usize,
    /// Keys left unbound because their reconciliation failed this run
    pub unbound_keys: Vec<String>,
}

/// Invoke the sink of every immediate binding; returns the number of sinks invoked
pub fn bind_immediate(bindings: &[ImmediateBinding]) -> usize {
    for binding in bindings {
        debug!(slot = %binding.slot, handle = %binding.handle, "Binding immediate emote");
        binding.target.bind(&binding.handle);
    }
    bindings.len()
}

/// Resolve each mapping from the ledger and invoke all of its sinks
///
/// Every handle is resolved before any sink runs. A key missing from the
/// ledger is an invariant violation unless its reconciliation failed this run.
pub fn bind_internal(
    mappings: &[InternalMapping],
    ledger: &Ledger,
    failed_keys: &HashSet<&str>,
) -> Result<BindSummary, SyncError> {
    let mut resolved: Vec<(&InternalMapping, Handle)> = Vec::with_capacity(mappings.len());
    let mut summary = BindSummary::default();

    for mapping in mappings {
        match ledger.get(&mapping.key) {
            Some(entry) => resolved.push((mapping, entry.handle())),
            None if failed_keys.contains(mapping.key.as_str()) => {
                warn!(
                    key = %mapping.key,
                    slots = mapping.slots.len(),
                    "Leaving emote unbound after failed reconciliation"
                );
                summary.unbound_keys.push(mapping.key.clone());
            }
            None => {
                return Err(SyncError::InvariantViolation(format!(
                    "no ledger entry for reconciled key '{}'",
                    mapping.key
                )))
            }
        }
    }

    for (mapping, handle) in resolved {
        debug!(
            key = %mapping.key,
            handle = %handle,
            sinks = mapping.targets.len(),
            "Binding internal emote"
        );
        for target in &mapping.targets {
            target.bind(&handle);
        }
        summary.bound_slots += mapping.targets.len();
    }

    Ok(summary)
}
