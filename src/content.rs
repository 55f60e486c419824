//! Content Store Abstraction
//!
//! The content store supplies raw emote bytes keyed by string. Keys double as
//! remote display names. Fingerprints are BLAKE3 digests of the full content and
//! are what the ledger compares to decide whether an upload is stale.

use crate::error::ContentError;
use async_trait::async_trait;
use blake3::Hasher;
use std::collections::BTreeSet;
use tokio::io::{AsyncRead, AsyncReadExt};

pub mod directory;
pub mod memory;

pub use directory::DirectoryContentSource;
pub use memory::MemoryContentSource;

/// Opaque content-derived identifier
pub type ContentIdentifier = Vec<u8>;

/// Byte stream for one content key. Dropping it releases the underlying handle.
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Content store trait
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Enumerate every key that currently has content
    async fn list_keys(&self) -> Result<BTreeSet<String>, ContentError>;

    /// Open a byte stream over the content for `key`
    async fn open_content(&self, key: &str) -> Result<ContentStream, ContentError>;

    /// Fingerprint of the content for `key`
    async fn fingerprint(&self, key: &str) -> Result<ContentIdentifier, ContentError>;
}

/// Compute the BLAKE3 fingerprint of in-memory content
pub fn fingerprint_bytes(content: &[u8]) -> ContentIdentifier {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().as_bytes().to_vec()
}

/// Compute the BLAKE3 fingerprint of a stream, consuming it
pub async fn fingerprint_stream<R>(mut reader: R) -> Result<ContentIdentifier, ContentError>
where
    R: AsyncRead + Unpin,
{
    let mut hasher = Hasher::new();
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().as_bytes().to_vec())
}

/// Open, fully read, and release the content stream for `key`
///
/// The stream never outlives this call, so at most one content handle is open
/// at a time when callers process keys sequentially.
pub async fn read_content(
    source: &dyn ContentSource,
    key: &str,
) -> Result<Vec<u8>, ContentError> {
    let mut stream = source.open_content(key).await?;
    let mut content = Vec::new();
    stream.read_to_end(&mut content).await?;
    Ok(content)
}

/// Reject keys that cannot double as a display name or a file stem
pub fn validate_key(key: &str) -> Result<(), ContentError> {
    if key.is_empty()
        || key.contains('/')
        || key.contains('\\')
        || key.contains(':')
        || key.chars().any(char::is_whitespace)
        || key == "."
        || key == ".."
    {
        return Err(ContentError::InvalidKey(key.to_string()));
    }
    Ok(())
}
