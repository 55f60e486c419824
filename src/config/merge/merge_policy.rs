//! Merge rules: defaults, override order, conflict handling.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("content.directory", "emotes")?
        .set_default("registry.token_env", "EMOTE_SYNC_TOKEN")?
        .set_default("registry.connect_timeout_secs", 10)?
        .set_default("registry.request_timeout_secs", 60)?
        .set_default("ledger.path", "emote-ledger.json")?
        .set_default("manifest.path", "emotes.toml")
}
