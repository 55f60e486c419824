//! In-memory content store.

use crate::content::{fingerprint_bytes, ContentIdentifier, ContentSource, ContentStream};
use crate::error::ContentError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

/// Content store backed by a map of key → bytes
#[derive(Debug, Default)]
pub struct MemoryContentSource {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the content for `key`
    pub fn insert(&self, key: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.entries.write().insert(key.into(), content.into());
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.write().remove(key)
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ContentError> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(key.to_string()))
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryContentSource
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let source = MemoryContentSource::new();
        for (key, content) in iter {
            source.insert(key, content);
        }
        source
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn list_keys(&self) -> Result<BTreeSet<String>, ContentError> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    async fn open_content(&self, key: &str) -> Result<ContentStream, ContentError> {
        Ok(Box::new(Cursor::new(self.get(key)?)))
    }

    async fn fingerprint(&self, key: &str) -> Result<ContentIdentifier, ContentError> {
        Ok(fingerprint_bytes(&self.get(key)?))
    }
}
