//! Error types for the emote synchronization engine.

use crate::emote::SlotId;
use crate::registry::RegistryOperation;
use std::time::Duration;
use thiserror::Error;

/// Content store errors
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Content not found for key: {0}")]
    NotFound(String),

    #[error("Invalid content key: {0}")]
    InvalidKey(String),

    #[error("Content I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Remote registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Registry rate limit exceeded (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Registry resource not found: {0}")]
    NotFound(u64),

    #[error("Registry request failed: {0}")]
    Request(String),

    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),
}

/// Synchronization errors
///
/// Everything here except `RegistryOperationFailed` for a single key aborts the run.
/// Per-key failures during reconciliation are collected into the sync report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No emote specification for slot '{slot}'")]
    MissingSpecification { slot: SlotId },

    #[error("Unsupported emote specification '{kind}' for slot '{slot}'")]
    UnsupportedSpecification { slot: SlotId, kind: String },

    #[error("No content available for emote key '{0}'")]
    ContentNotFound(String),

    #[error("Content store unavailable: {0}")]
    ContentUnavailable(#[source] ContentError),

    #[error("Content error for key '{key}': {source}")]
    Content {
        key: String,
        #[source]
        source: ContentError,
    },

    #[error("Registry {op} failed{}: {source}", key_suffix(.key))]
    RegistryOperationFailed {
        op: RegistryOperation,
        key: Option<String>,
        #[source]
        source: RegistryError,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

fn key_suffix(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" for key '{}'", key),
        None => String::new(),
    }
}

impl SyncError {
    /// True when a run aborted with this error before any remote or ledger mutation.
    ///
    /// Applies to errors returned from a run. A `Content` error recorded as a per-key
    /// failure comes from reconciliation and is never returned this way.
    pub fn is_pre_mutation(&self) -> bool {
        matches!(
            self,
            SyncError::MissingSpecification { .. }
                | SyncError::UnsupportedSpecification { .. }
                | SyncError::ContentNotFound(_)
                | SyncError::ContentUnavailable(_)
                | SyncError::Content { .. }
                | SyncError::RegistryOperationFailed {
                    op: RegistryOperation::List,
                    ..
                }
                | SyncError::Manifest(_)
                | SyncError::ConfigError(_)
        )
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::ConfigError(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Manifest(err.to_string())
    }
}
