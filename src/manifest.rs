//! Emote manifest: declarative desired state in TOML.
//!
//! ```toml
//! [[slot]]
//! slot = "thinking"
//! kind = "unicode"
//! character = "🤔"
//!
//! [[slot]]
//! slot = "okay"
//! kind = "external"
//! name = "okay"
//! id = 123
//!
//! [[slot]]
//! slot = "party"
//! kind = "internal"
//! key = "party"
//! ```
//!
//! Slots keep file order. Validation of kinds and required fields is deferred to
//! discovery, so a bad slot surfaces as the same error a programmatic caller gets.

use crate::discovery::{BindTarget, DesiredEmotes, SlotSpecification};
use crate::emote::{EmoteSpecification, RemoteId, SlotId};
use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One `[[slot]]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSlot {
    pub slot: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<RemoteId>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub key: Option<String>,
}

impl ManifestSlot {
    /// Interpret the table; `None` when the kind or one of its fields is missing
    pub fn specification(&self) -> Option<SlotSpecification> {
        let kind = self.kind.as_deref()?;
        let specification = match kind {
            "unicode" => EmoteSpecification::Unicode {
                character: self.character.clone()?,
            },
            "external" => EmoteSpecification::ExternalCustom {
                name: self.name.clone()?,
                id: self.id?,
                animated: self.animated,
            },
            "internal" => EmoteSpecification::InternalCustom {
                key: self.key.clone()?,
            },
            other => {
                return Some(SlotSpecification::Unrecognized {
                    kind: other.to_string(),
                })
            }
        };
        Some(SlotSpecification::Declared(specification))
    }
}

#[derive(Deserialize)]
struct ManifestFile {
    #[serde(default, rename = "slot")]
    slots: Vec<ManifestSlot>,
}

/// Parsed manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmoteManifest {
    slots: Vec<ManifestSlot>,
}

impl EmoteManifest {
    pub fn from_toml_str(text: &str) -> Result<Self, SyncError> {
        let file: ManifestFile = toml::from_str(text)?;
        let mut seen = HashSet::new();
        for slot in &file.slots {
            if slot.slot.trim().is_empty() {
                return Err(SyncError::Manifest("slot id cannot be empty".to_string()));
            }
            if !seen.insert(slot.slot.as_str()) {
                return Err(SyncError::Manifest(format!(
                    "duplicate slot id '{}'",
                    slot.slot
                )));
            }
        }
        Ok(Self { slots: file.slots })
    }

    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Manifest(format!("Failed to read manifest {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn slots(&self) -> &[ManifestSlot] {
        &self.slots
    }

    /// Attach a sink to every slot, producing the desired state for one run
    pub fn to_desired<F>(&self, mut target_for: F) -> DesiredEmotes
    where
        F: FnMut(&SlotId) -> BindTarget,
    {
        let mut desired = DesiredEmotes::new();
        for slot in &self.slots {
            let id = SlotId::new(slot.slot.clone());
            let target = target_for(&id);
            desired.declare(id, slot.specification(), target);
        }
        desired
    }
}
