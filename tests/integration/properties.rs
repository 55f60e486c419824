//! Property-based tests for discovery, fingerprints and convergence

use crate::integration::test_utils::FakeRegistry;
use emote_sync::content::{fingerprint_bytes, fingerprint_stream};
use emote_sync::discovery::discover;
use emote_sync::{
    DesiredEmotes, EmoteSpecification, EmoteSynchronizer, Handle, Ledger, LedgerEntry,
    MemoryContentSource,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

const KEYS: &[&str] = &["okay", "party", "wave", "think", "blob"];

fn noop(_: &Handle) {}

/// Fingerprinting a stream matches fingerprinting the same bytes in memory
#[test]
fn test_stream_fingerprint_matches_bytes() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&proptest::collection::vec(any::<u8>(), 0..200_000), |content| {
            let streamed = runtime
                .block_on(fingerprint_stream(std::io::Cursor::new(content.clone())))
                .unwrap();
            prop_assert_eq!(streamed, fingerprint_bytes(&content));
            Ok(())
        })
        .unwrap();
}

proptest! {
    /// Internal keys are deduplicated in first-seen order and no slot is lost
    #[test]
    fn prop_discovery_dedups_in_order(
        slots in proptest::collection::vec((0usize..KEYS.len(), any::<bool>()), 0..24)
    ) {
        let mut desired = DesiredEmotes::new();
        for (index, (key, internal)) in slots.iter().enumerate() {
            let spec = if *internal {
                EmoteSpecification::internal(KEYS[*key])
            } else {
                EmoteSpecification::unicode("🤔")
            };
            desired.bind(format!("slot{}", index), spec, noop);
        }

        let discovery = discover(&desired).unwrap();

        let mut expected: Vec<&str> = Vec::new();
        for (key, internal) in &slots {
            if *internal && !expected.contains(&KEYS[*key]) {
                expected.push(KEYS[*key]);
            }
        }
        let keys: Vec<&str> = discovery.internal.iter().map(|m| m.key.as_str()).collect();
        prop_assert_eq!(keys, expected);

        let internal_slots: usize = discovery.internal.iter().map(|m| m.slots.len()).sum();
        prop_assert_eq!(internal_slots, slots.iter().filter(|(_, i)| *i).count());
        prop_assert_eq!(discovery.immediate.len() + internal_slots, slots.len());
    }

    /// One run converges the ledger onto the desired keys; the next run changes nothing
    #[test]
    fn prop_single_run_converges(
        desired_mask in proptest::collection::vec(any::<bool>(), KEYS.len()),
        tracked_mask in proptest::collection::vec(0u8..4, KEYS.len()),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let content: MemoryContentSource =
            KEYS.iter().map(|k| (*k, k.as_bytes().to_vec())).collect();
        let mut registry = FakeRegistry::new();
        let mut entries = Vec::new();

        // 0 untracked, 1 current, 2 stale content, 3 tracked but gone remotely
        for (index, state) in tracked_mask.iter().enumerate() {
            let key = KEYS[index];
            let id = 100 + index as u64;
            if *state == 0 {
                continue;
            }
            if *state != 3 {
                registry = registry.with_resource(id, key, false);
            }
            let fingerprint = if *state == 2 {
                fingerprint_bytes(b"stale")
            } else {
                fingerprint_bytes(key.as_bytes())
            };
            entries.push(LedgerEntry {
                key: key.to_string(),
                remote_id: id,
                animated: false,
                content_identifier: fingerprint,
            });
        }

        let registry = Arc::new(registry);
        let synchronizer = EmoteSynchronizer::new(Arc::new(content), registry.clone());
        let mut desired = DesiredEmotes::new();
        for (index, wanted) in desired_mask.iter().enumerate() {
            if *wanted {
                desired.bind(KEYS[index], EmoteSpecification::internal(KEYS[index]), noop);
            }
        }

        let mut ledger = Ledger::from_entries(entries);
        let report = runtime.block_on(synchronizer.synchronize(&desired, &mut ledger)).unwrap();
        prop_assert!(report.is_converged());

        let wanted: BTreeSet<&str> = KEYS
            .iter()
            .zip(&desired_mask)
            .filter(|(_, w)| **w)
            .map(|(k, _)| *k)
            .collect();
        let tracked: BTreeSet<&str> = ledger.keys().collect();
        prop_assert_eq!(&tracked, &wanted);
        for entry in &ledger {
            prop_assert_eq!(&entry.content_identifier, &fingerprint_bytes(entry.key.as_bytes()));
            prop_assert!(registry.resource(entry.remote_id).is_some());
        }

        registry.clear_calls();
        let report = runtime.block_on(synchronizer.synchronize(&desired, &mut ledger)).unwrap();
        prop_assert_eq!(report.change_count() + report.pruned.len(), 0);
        prop_assert!(registry.mutating_calls().is_empty());
    }
}
