//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources override earlier ones key by key, so a workspace file only
//! needs the keys it changes.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("generation.output_root", "generated")?
        .set_default("generation.template_marker", "tmpl")?
        .set_default("generation.preserve_structure", false)?
        .set_default("generation.ignore_errors", false)?
        .set_default("generation.policy", "per_item")?
        .set_default("generation.parallel", true)?
        .set_default("generation.max_threads", 0)?
        .set_default("storage.store_dir", ".kiln")
}
