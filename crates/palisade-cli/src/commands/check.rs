//! Evaluate a single permission query.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use palisade::{Action, PalisadeConfig, PermissionContext, ResourceKind, Scope};
use serde_json::Value;

use crate::style::colors::SemanticStyle;
use crate::style::info_table;

#[derive(Args)]
pub struct CheckArgs {
    /// Rule document (defaults to rules.path from the configuration).
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Subject id.
    #[arg(long)]
    pub subject: String,

    /// Subject role (repeatable).
    #[arg(long = "role", required = true)]
    pub roles: Vec<String>,

    /// Resource kind (contacts, invoices, ...).
    #[arg(long)]
    pub resource: String,

    /// Action (read, update, approve, ...).
    #[arg(long)]
    pub action: String,

    /// Request scope (global, project, record). Defaults to record when an
    /// instance is given, global otherwise.
    #[arg(long)]
    pub scope: Option<String>,

    /// Project instance id.
    #[arg(long)]
    pub project: Option<String>,

    /// Record instance id.
    #[arg(long)]
    pub record: Option<String>,

    /// Resource instance as JSON.
    #[arg(long)]
    pub instance: Option<String>,

    /// Subject attributes as JSON.
    #[arg(long)]
    pub attributes: Option<String>,

    /// Emit the decision as JSON.
    #[arg(long)]
    pub json: bool,
}

fn parse_json(flag: &str, text: Option<&str>) -> Result<Option<Value>> {
    text.map(|text| {
        serde_json::from_str(text).with_context(|| format!("--{flag} is not valid JSON"))
    })
    .transpose()
}

/// Builds the context, evaluates it and prints the decision.
///
/// A denial is a normal outcome and exits successfully.
pub async fn run(config: &PalisadeConfig, args: CheckArgs) -> Result<()> {
    let resource: ResourceKind = args.resource.parse()?;
    let action: Action = args.action.parse()?;
    let instance = parse_json("instance", args.instance.as_deref())?;
    let attributes = parse_json("attributes", args.attributes.as_deref())?;
    let scope = match args.scope.as_deref() {
        Some(scope) => scope.parse()?,
        None if instance.is_some() => Scope::Record,
        None => Scope::Global,
    };

    let mut builder = PermissionContext::builder(args.subject, resource, action)
        .roles(args.roles)
        .scope(scope);
    if let Some(attributes) = attributes {
        builder = builder.subject_attributes(attributes);
    }
    if let Some(instance) = instance {
        builder = builder.instance(instance);
    }
    if let Some(project) = args.project {
        builder = builder.project(project);
    }
    if let Some(record) = args.record {
        builder = builder.record(record);
    }
    let ctx = builder.build()?;

    let palisade = super::open_rules(config, args.rules.as_deref()).await?;
    let decision = palisade.evaluator().evaluate(&ctx);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    let verdict = if decision.is_allowed() {
        "ALLOW".success()
    } else {
        "DENY".error()
    };
    println!("{verdict} {resource}:{action} at {scope} scope");

    let matched = decision
        .matched_rule
        .as_ref()
        .map_or_else(|| "none".to_string(), |rule| rule.id.to_string());
    let table = info_table(&[
        ("reason", decision.reason.clone()),
        ("matched rule", matched),
        ("inherited", decision.inherited.to_string()),
        ("rule set", palisade.evaluator().store().current_version().to_string()),
    ]);
    println!("{table}");

    Ok(())
}
