//! Emote data model: declared specifications and resolved handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote registry identifier for a custom emote
pub type RemoteId = u64;

/// Identifier of a desired-state slot supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        SlotId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(value: &str) -> Self {
        SlotId::new(value)
    }
}

impl From<String> for SlotId {
    fn from(value: String) -> Self {
        SlotId(value)
    }
}

/// Declared emote for a slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmoteSpecification {
    /// A plain unicode emoji; never touches the registry.
    Unicode { character: String },
    /// A custom emote that already exists remotely and is not managed here.
    #[serde(rename = "external")]
    ExternalCustom {
        name: String,
        id: RemoteId,
        #[serde(default)]
        animated: bool,
    },
    /// A custom emote uploaded from the content store. `key` is both the
    /// content lookup key and the remote display name.
    #[serde(rename = "internal")]
    InternalCustom { key: String },
}

impl EmoteSpecification {
    pub fn unicode(character: impl Into<String>) -> Self {
        EmoteSpecification::Unicode {
            character: character.into(),
        }
    }

    pub fn external(name: impl Into<String>, id: RemoteId, animated: bool) -> Self {
        EmoteSpecification::ExternalCustom {
            name: name.into(),
            id,
            animated,
        }
    }

    pub fn internal(key: impl Into<String>) -> Self {
        EmoteSpecification::InternalCustom { key: key.into() }
    }

    /// Handle known without reconciliation, if any
    pub fn immediate_handle(&self) -> Option<Handle> {
        match self {
            EmoteSpecification::Unicode { character } => Some(Handle::Unicode {
                character: character.clone(),
            }),
            EmoteSpecification::ExternalCustom { name, id, animated } => Some(Handle::Custom {
                remote_id: *id,
                name: name.clone(),
                animated: *animated,
            }),
            EmoteSpecification::InternalCustom { .. } => None,
        }
    }
}

/// A resolved emote, recomputed on every run and never persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Handle {
    Unicode {
        character: String,
    },
    Custom {
        remote_id: RemoteId,
        name: String,
        animated: bool,
    },
}

impl fmt::Display for Handle {
    /// Renders in the `<:name:id>` / `<a:name:id>` mention form for custom emotes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Unicode { character } => f.write_str(character),
            Handle::Custom {
                remote_id,
                name,
                animated,
            } => {
                let prefix = if *animated { "a" } else { "" };
                write!(f, "<{}:{}:{}>", prefix, name, remote_id)
            }
        }
    }
}
