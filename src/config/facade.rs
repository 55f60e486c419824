//! Config facade: public load API.

use super::merge::builder_with_defaults;
use super::sources::{environment, global_file, workspace_file};
use super::SyncConfig;
use config::{Config, ConfigError, File};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with precedence:
    /// 1. Merge-policy defaults
    /// 2. User-level config file (platform config dir, e.g. ~/.config/emote-sync/config.toml)
    /// 3. Workspace config/config.toml
    /// 4. Workspace config/{EMOTE_SYNC_ENV}.toml
    /// 5. Environment variables (EMOTE_SYNC__*)
    pub fn load(workspace_root: &Path) -> Result<SyncConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Load configuration from a single file, defaults filling the gaps
    pub fn load_from_file(path: &Path) -> Result<SyncConfig, ConfigError> {
        builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Defaults only
    pub fn default() -> SyncConfig {
        Config::builder()
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap_or_default()
    }
}
