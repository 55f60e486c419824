//! Emote Sync: declarative emote synchronization
//!
//! Callers declare which emote each slot wants: a Unicode character, an existing
//! custom emote on the registry, or an internal emote whose image lives in a
//! content store. A run uploads, replaces and deletes registry emotes so the
//! registry matches the declaration, records what it did in a caller-owned
//! ledger, and hands every slot its resolved handle.

pub mod binder;
pub mod cli;
pub mod config;
pub mod content;
pub mod discovery;
pub mod emote;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod manifest;
pub mod reconcile;
pub mod registry;
pub mod sync;

pub use content::{ContentIdentifier, ContentSource, DirectoryContentSource, MemoryContentSource};
pub use discovery::{BindTarget, DesiredEmotes, EmoteSink};
pub use emote::{EmoteSpecification, Handle, RemoteId, SlotId};
pub use error::{ContentError, RegistryError, SyncError};
pub use ledger::{Ledger, LedgerEntry};
pub use reconcile::ReconcilePlan;
pub use registry::{RegistryClient, RemoteResource};
pub use sync::{EmoteSynchronizer, SyncReport};
