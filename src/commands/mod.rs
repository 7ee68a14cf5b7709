pub mod inspect;
pub mod run;

use anyhow::{Context, Result};
use std::path::Path;

use replybot::config::Config;

// Re-export command functions for convenience
pub use inspect::{check, ledger, plan};
pub use run::run;

/// Config file plus environment overrides, validated
pub fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("Invalid configuration: {}", path.display()))
}
