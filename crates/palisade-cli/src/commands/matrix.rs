//! Print the derived permission matrix.

use std::path::PathBuf;

use anyhow::Result;
use palisade::{PalisadeConfig, Role};

use crate::style::colors::SemanticStyle;
use crate::style::matrix_table;

pub async fn run(
    config: &PalisadeConfig,
    rules: Option<PathBuf>,
    roles: &[String],
    json: bool,
    all: bool,
) -> Result<()> {
    let palisade = super::open_rules(config, rules.as_deref()).await?;
    let extra_roles: Vec<Role> = roles.iter().map(|role| Role::new(role.as_str())).collect();
    let matrix = palisade.matrix(&extra_roles);

    if json {
        println!("{}", serde_json::to_string_pretty(&matrix)?);
        return Ok(());
    }

    if matrix.roles.is_empty() {
        println!("{}", "No roles in rule document.".muted());
        return Ok(());
    }

    println!("{}", matrix_table(&matrix, all));
    println!(
        "{}",
        "Only unconditional global rules without an instance are shown.".muted()
    );
    Ok(())
}
