//! Emote ledger: the durable mapping from content key to remote identity.
//!
//! The caller owns and persists the ledger; the engine only mutates entries in
//! place during a run. Entry order is preserved and keys are unique.

use crate::content::ContentIdentifier;
use crate::emote::{Handle, RemoteId};
use serde::{Deserialize, Serialize};

/// One tracked internal emote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: String,
    pub remote_id: RemoteId,
    pub animated: bool,
    /// Fingerprint of the content that was uploaded, hex-encoded when serialized.
    #[serde(with = "hex_bytes")]
    pub content_identifier: ContentIdentifier,
}

impl LedgerEntry {
    pub fn handle(&self) -> Handle {
        Handle::Custom {
            remote_id: self.remote_id,
            name: self.key.clone(),
            animated: self.animated,
        }
    }
}

/// Ordered, key-unique collection of ledger entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LedgerEntry>", into = "Vec<LedgerEntry>")]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from rows, keeping the first row for any repeated key
    pub fn from_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
        let mut ledger = Ledger::new();
        for entry in entries {
            if ledger.get(&entry.key).is_none() {
                ledger.entries.push(entry);
            }
        }
        ledger
    }

    pub fn get(&self, key: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert a new entry or overwrite the existing one for the same key in place
    pub fn upsert(&mut self, entry: LedgerEntry) {
        match self.entries.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<LedgerEntry> {
        let index = self.entries.iter().position(|e| e.key == key)?;
        Some(self.entries.remove(index))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<LedgerEntry>> for Ledger {
    fn from(entries: Vec<LedgerEntry>) -> Self {
        Ledger::from_entries(entries)
    }
}

impl From<Ledger> for Vec<LedgerEntry> {
    fn from(ledger: Ledger) -> Self {
        ledger.entries
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a LedgerEntry;
    type IntoIter = std::slice::Iter<'a, LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text).map_err(serde::de::Error::custom)
    }
}
