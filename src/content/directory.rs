//! Directory-backed content store
//!
//! Every image file directly inside the root directory is one content key: the
//! file stem is the key and the extension must be on the allow-list. The
//! directory is rescanned on every call so edits between runs are picked up.

use crate::content::{
    fingerprint_stream, validate_key, ContentIdentifier, ContentSource, ContentStream,
};
use crate::error::ContentError;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Default image extensions accepted as emote content
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "gif", "webp", "jpg", "jpeg"];

/// Content store over a flat directory of image files
#[derive(Debug, Clone)]
pub struct DirectoryContentSource {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryContentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Replace the extension allow-list (compared case-insensitively)
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| {
                let extension: String = e.into();
                extension.trim_start_matches('.').to_ascii_lowercase()
            })
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root and map each key to its file
    ///
    /// Paths are visited in sorted order; when two files share a stem the first wins.
    fn scan(&self) -> Result<BTreeMap<String, PathBuf>, ContentError> {
        let mut files: BTreeMap<String, PathBuf> = BTreeMap::new();

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                ContentError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to scan content directory {:?}: {}", self.root, e),
                ))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(key) = self.key_for(path) else {
                continue;
            };

            if let Some(existing) = files.get(&key) {
                warn!(
                    key = %key,
                    kept = %existing.display(),
                    ignored = %path.display(),
                    "Duplicate content key in directory"
                );
                continue;
            }
            files.insert(key, path.to_path_buf());
        }

        Ok(files)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if !self.extensions.iter().any(|e| *e == extension) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        validate_key(stem).ok()?;
        Some(stem.to_string())
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, ContentError> {
        validate_key(key)?;
        self.scan()?
            .remove(key)
            .ok_or_else(|| ContentError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl ContentSource for DirectoryContentSource {
    async fn list_keys(&self) -> Result<BTreeSet<String>, ContentError> {
        Ok(self.scan()?.into_keys().collect())
    }

    async fn open_content(&self, key: &str) -> Result<ContentStream, ContentError> {
        let path = self.resolve(key)?;
        let file = tokio::fs::File::open(&path).await?;
        Ok(Box::new(file))
    }

    async fn fingerprint(&self, key: &str) -> Result<ContentIdentifier, ContentError> {
        let path = self.resolve(key)?;
        let file = tokio::fs::File::open(&path).await?;
        fingerprint_stream(file).await
    }
}
