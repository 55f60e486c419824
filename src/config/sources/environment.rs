//! Environment source: EMOTE_SYNC__SECTION__KEY, e.g. EMOTE_SYNC__REGISTRY__BASE_URL.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub const PREFIX: &str = "EMOTE_SYNC";
pub const SEPARATOR: &str = "__";

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(PREFIX)
            .prefix_separator(SEPARATOR)
            .separator(SEPARATOR),
    )
}
