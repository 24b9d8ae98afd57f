//! Configuration management commands.

use anyhow::{Result, bail};
use palisade::PalisadeConfig;

/// Show the effective configuration.
pub fn show(config: &PalisadeConfig, format: &str) -> Result<()> {
    match format {
        "toml" => print!("{}", config.to_toml()?),
        "json" => println!("{}", serde_json::to_string_pretty(config)?),
        other => bail!("Unknown format '{other}' (expected toml or json)"),
    }
    Ok(())
}
