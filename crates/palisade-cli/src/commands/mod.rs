//! CLI command implementations.

pub mod check;
pub mod config;
pub mod matrix;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use palisade::{ConfigLoader, Palisade, PalisadeConfig};
use tracing::debug;

/// Loads the layered configuration rooted at `config_dir`.
pub fn load_config(config_dir: &Path) -> Result<PalisadeConfig> {
    ConfigLoader::new()
        .with_project_dir(config_dir)
        .load()
        .context("Failed to load configuration")
}

/// Rule document path: `--rules` if given, the configured one otherwise.
pub fn rules_path(config: &PalisadeConfig, rules: Option<&Path>) -> PathBuf {
    rules.map_or_else(|| config.rules.path.clone(), Path::to_path_buf)
}

/// Opens the rule document, failing if it cannot be loaded.
pub async fn open_rules(config: &PalisadeConfig, rules: Option<&Path>) -> Result<Palisade> {
    let mut config = config.clone();
    config.rules.path = rules_path(&config, rules);
    debug!(path = %config.rules.path.display(), "Opening rule document");

    Palisade::try_open(&config)
        .await
        .with_context(|| format!("Failed to load rules from {}", config.rules.path.display()))
}
