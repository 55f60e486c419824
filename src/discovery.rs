//! Specification discovery
//!
//! Normalizes caller-declared slots into bindings that resolve immediately
//! (unicode and external custom emotes) and a deduplicated list of internal
//! key mappings. Several slots may share one internal key; they collapse into a
//! single mapping carrying every slot's bind target in registration order.

use crate::emote::{EmoteSpecification, Handle, SlotId};
use crate::error::SyncError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Receives the resolved handle for a slot
pub trait EmoteSink: Send + Sync {
    fn bind(&self, handle: &Handle);
}

impl<F> EmoteSink for F
where
    F: Fn(&Handle) + Send + Sync,
{
    fn bind(&self, handle: &Handle) {
        self(handle)
    }
}

/// Shared sink reference; one per declared slot
pub type BindTarget = Arc<dyn EmoteSink>;

/// Specification as declared for a slot, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSpecification {
    Declared(EmoteSpecification),
    /// A kind this engine does not know how to resolve.
    Unrecognized { kind: String },
}

impl From<EmoteSpecification> for SlotSpecification {
    fn from(value: EmoteSpecification) -> Self {
        SlotSpecification::Declared(value)
    }
}

/// One caller-supplied `(slot, specification, sink)` triple
pub struct SlotDeclaration {
    pub slot: SlotId,
    pub specification: Option<SlotSpecification>,
    pub target: BindTarget,
}

/// Desired state for a single run
///
/// Rebuilt by the caller for every run; nothing here is persisted.
#[derive(Default)]
pub struct DesiredEmotes {
    slots: Vec<SlotDeclaration>,
}

impl DesiredEmotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a slot with a known specification
    pub fn bind<S>(
        &mut self,
        slot: impl Into<SlotId>,
        specification: EmoteSpecification,
        target: S,
    ) -> &mut Self
    where
        S: EmoteSink + 'static,
    {
        self.declare(slot, Some(specification.into()), Arc::new(target))
    }

    /// Declare a slot whose specification may be missing or unrecognized
    pub fn declare(
        &mut self,
        slot: impl Into<SlotId>,
        specification: Option<SlotSpecification>,
        target: BindTarget,
    ) -> &mut Self {
        self.slots.push(SlotDeclaration {
            slot: slot.into(),
            specification,
            target,
        });
        self
    }

    pub fn slots(&self) -> &[SlotDeclaration] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A slot whose handle is known without touching the registry
pub struct ImmediateBinding {
    pub slot: SlotId,
    pub handle: Handle,
    pub target: BindTarget,
}

impl fmt::Debug for ImmediateBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmediateBinding")
            .field("slot", &self.slot)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// All slots bound to one internal content key
pub struct InternalMapping {
    pub key: String,
    pub slots: Vec<SlotId>,
    pub targets: Vec<BindTarget>,
}

impl fmt::Debug for InternalMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalMapping")
            .field("key", &self.key)
            .field("slots", &self.slots)
            .field("targets", &self.targets.len())
            .finish()
    }
}

/// Output of discovery
#[derive(Debug, Default)]
pub struct Discovery {
    pub immediate: Vec<ImmediateBinding>,
    pub internal: Vec<InternalMapping>,
}

impl Discovery {
    /// Distinct internal keys in registration order
    pub fn internal_keys(&self) -> Vec<String> {
        self.internal.iter().map(|m| m.key.clone()).collect()
    }

    pub fn mapping(&self, key: &str) -> Option<&InternalMapping> {
        self.internal.iter().find(|m| m.key == key)
    }
}

/// Split declared slots into immediate bindings and deduplicated internal mappings
///
/// Fails on the first slot without a usable specification; nothing has been
/// mutated at that point.
pub fn discover(desired: &DesiredEmotes) -> Result<Discovery, SyncError> {
    let mut discovery = Discovery::default();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for declaration in desired.slots() {
        let specification = match &declaration.specification {
            None => {
                return Err(SyncError::MissingSpecification {
                    slot: declaration.slot.clone(),
                })
            }
            Some(SlotSpecification::Unrecognized { kind }) => {
                return Err(SyncError::UnsupportedSpecification {
                    slot: declaration.slot.clone(),
                    kind: kind.clone(),
                })
            }
            Some(SlotSpecification::Declared(spec)) => spec,
        };

        if let Some(handle) = specification.immediate_handle() {
            discovery.immediate.push(ImmediateBinding {
                slot: declaration.slot.clone(),
                handle,
                target: Arc::clone(&declaration.target),
            });
            continue;
        }

        let EmoteSpecification::InternalCustom { key } = specification else {
            continue;
        };

        match index_by_key.get(key) {
            Some(&index) => {
                let mapping = &mut discovery.internal[index];
                mapping.slots.push(declaration.slot.clone());
                mapping.targets.push(Arc::clone(&declaration.target));
            }
            None => {
                index_by_key.insert(key.clone(), discovery.internal.len());
                discovery.internal.push(InternalMapping {
                    key: key.clone(),
                    slots: vec![declaration.slot.clone()],
                    targets: vec![Arc::clone(&declaration.target)],
                });
            }
        }
    }

    Ok(discovery)
}
