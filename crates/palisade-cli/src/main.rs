//! Palisade CLI.
//!
//! Offline inspection of permission rule documents.
//!
//! # Quick Start
//!
//! ```bash
//! # Is sales allowed to update this contact?
//! palisade check --rules rules.json --subject U1 --role sales \
//!     --resource contacts --action update --instance '{"id":"C1","ownerId":"U1"}'
//!
//! # Role x permission grid
//! palisade matrix --rules rules.json
//!
//! # Lint a document
//! palisade validate --rules rules.json
//! ```

mod commands;
mod style;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::check::CheckArgs;

/// Palisade - permission evaluation for business applications.
#[derive(Parser)]
#[command(name = "palisade")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding palisade.toml.
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one permission query against a rule document.
    Check(CheckArgs),

    /// Print the derived role x permission matrix.
    Matrix {
        /// Rule document (defaults to rules.path from the configuration).
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Include a role even if no rule mentions it (repeatable).
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Include permissions no role is granted.
        #[arg(long)]
        all: bool,
    },

    /// Parse a rule document and report problems.
    Validate {
        /// Rule document (defaults to rules.path from the configuration).
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Configuration commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        /// Output format (toml, json).
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        style::set_no_color(true);
    }

    let config = commands::load_config(&cli.config_dir)?;

    // Initialize logging; RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => commands::check::run(&config, args).await,
        Commands::Matrix {
            rules,
            roles,
            json,
            all,
        } => commands::matrix::run(&config, rules, &roles, json, all).await,
        Commands::Validate { rules } => {
            commands::validate::run(&config, rules.as_deref()).await
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show { format } => commands::config::show(&config, &format),
        },
    }
}
