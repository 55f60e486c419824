//! Remote Emoji Registry Abstraction
//!
//! The registry is an external, rate-limited service exposing list/create/delete
//! of named custom emotes. It offers no transactional read-modify-write, so the
//! reconciler treats a freshly fetched [`Snapshot`] as ground truth for existence.

use crate::emote::RemoteId;
use crate::error::RegistryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub mod http;

pub use http::{HttpRegistryClient, HttpRegistryConfig};

/// Remote operation kind, used when reporting failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryOperation {
    List,
    Create,
    Delete,
}

impl fmt::Display for RegistryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistryOperation::List => "list",
            RegistryOperation::Create => "create",
            RegistryOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A custom emote as reported by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResource {
    pub id: RemoteId,
    pub name: String,
    pub animated: bool,
}

/// Registry response to a successful create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResource {
    pub id: RemoteId,
    pub animated: bool,
}

/// Remote emoji registry client trait
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// List every custom emote currently in the registry
    async fn list_resources(&self) -> Result<Vec<RemoteResource>, RegistryError>;

    /// Upload `content` as a new emote named `name`
    async fn create_resource(
        &self,
        name: &str,
        content: Vec<u8>,
    ) -> Result<CreatedResource, RegistryError>;

    /// Delete the emote with the given id
    async fn delete_resource(&self, id: RemoteId) -> Result<(), RegistryError>;
}

/// Point-in-time view of the registry for one run
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    resources: Vec<RemoteResource>,
    ids: HashSet<RemoteId>,
}

impl Snapshot {
    pub fn new(resources: Vec<RemoteResource>) -> Self {
        let ids = resources.iter().map(|r| r.id).collect();
        Self { resources, ids }
    }

    /// Fetch a fresh snapshot from the registry
    pub async fn fetch(registry: &dyn RegistryClient) -> Result<Self, RegistryError> {
        Ok(Self::new(registry.list_resources().await?))
    }

    pub fn contains_id(&self, id: RemoteId) -> bool {
        self.ids.contains(&id)
    }

    /// Every resource whose name matches exactly
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RemoteResource> + 'a {
        self.resources.iter().filter(move |r| r.name == name)
    }

    pub fn resources(&self) -> &[RemoteResource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
