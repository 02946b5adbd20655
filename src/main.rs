//! zem-grid: breakdown grid inspector
//!
//! Loads a hierarchical breakdown grid from a fixture dataset or an HTTP
//! backend and prints it, or lists the columns a level resolves to.

#![allow(clippy::needless_pass_by_value)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zem_grid::{
    cli::{self, ColumnsOptions, OutputFormat, ShowOptions},
    config::{ConfigPreset, GridConfig, Validatable},
    model::{Breakdown, Level, Order},
};

#[derive(Parser)]
#[command(name = "zem-grid")]
#[command(version)]
#[command(about = "Breakdown grid inspector", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Built-in sample grid, broken down by ad group and country
    zem-grid show --path ad_group,country

    # Fixture dataset, two extra pages per node, as JSON
    zem-grid show --fixture grid.json --more 2 -o json

    # Columns of the ad group level for a media source breakdown
    zem-grid columns --level ad_groups --path source")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Configuration preset (default, compact, deep)
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ShowArgs {
    /// Fixture dataset (JSON); the built-in sample when omitted
    #[arg(long, conflicts_with = "url")]
    fixture: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, env = "ZEM_GRID_URL")]
    url: Option<String>,

    /// Backend level (all_accounts, accounts, campaigns, ad_groups)
    #[arg(long, value_parser = parse_level, requires = "url")]
    level: Option<Level>,

    /// Entity id at the backend level
    #[arg(long, requires = "url")]
    id: Option<u64>,

    /// Comma-separated breakdown path, e.g. `ad_group,country,day`
    #[arg(long)]
    path: Option<String>,

    /// Sort order, `-` prefix for descending (e.g. `-clicks`)
    #[arg(long)]
    order: Option<String>,

    /// Include archived rows
    #[arg(long)]
    archived: bool,

    /// Load-more rounds for every incomplete node
    #[arg(long, default_value_t = 0)]
    more: usize,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(long)]
    output_file: Option<PathBuf>,
}

#[derive(clap::Args)]
struct ColumnsArgs {
    /// Grid level
    #[arg(long, value_parser = parse_level, default_value = "accounts")]
    level: Level,

    /// Comma-separated breakdown path
    #[arg(long)]
    path: Option<String>,

    /// Granted capability (repeatable)
    #[arg(long = "capability")]
    capabilities: Vec<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Write output to file instead of stdout
    #[arg(long)]
    output_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a grid and print its rows
    Show(ShowArgs),

    /// List the columns resolved for a level and breakdown path
    Columns(ColumnsArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show, discover, or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Sub-subcommands for the `config` command
#[derive(Subcommand)]
enum ConfigAction {
    /// Print current effective configuration (merged from defaults + file)
    Show,
    /// Print the discovered config file
    Path,
    /// Generate an example .zem-grid.yaml in the current directory
    Init,
}

fn parse_level(value: &str) -> Result<Level, String> {
    Level::from_name(value).ok_or_else(|| format!("unknown level '{value}'"))
}

fn parse_path(value: Option<&str>) -> Result<Vec<Breakdown>> {
    value.map_or_else(
        || Ok(Vec::new()),
        |spec| Breakdown::parse_path(spec).map_err(anyhow::Error::msg),
    )
}

fn load_config(cli: &Cli) -> Result<GridConfig> {
    let base = match cli.preset.as_deref() {
        Some(name) => GridConfig::from_preset(
            ConfigPreset::from_name(name).with_context(|| format!("unknown preset '{name}'"))?,
        ),
        None => GridConfig::default(),
    };
    let (config, loaded_from) = GridConfig::from_file_with_overrides(cli.config.as_deref(), &base);
    if let Some(path) = loaded_from {
        tracing::debug!("Using config file {}", path.display());
    }
    for error in config.validate() {
        tracing::warn!("Invalid configuration: {}", error);
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    match &cli.command {
        Commands::Show(args) => {
            let config = load_config(&cli)?;
            let options = ShowOptions {
                fixture: args.fixture.clone(),
                url: args.url.clone(),
                level: args.level,
                entity_id: args.id,
                path: parse_path(args.path.as_deref())?,
                order: args.order.as_deref().map(Order::parse),
                show_archived: args.archived,
                more: args.more,
                format: args.output,
                output_file: args.output_file.clone(),
            };
            cli::run_show(options, config)
        }

        Commands::Columns(args) => cli::run_columns(ColumnsOptions {
            level: args.level,
            path: parse_path(args.path.as_deref())?,
            capabilities: args.capabilities.clone(),
            format: args.output,
            output_file: args.output_file.clone(),
        }),

        Commands::Completions { shell } => {
            generate(*shell, &mut Cli::command(), "zem-grid", &mut io::stdout());
            Ok(())
        }

        Commands::ConfigSchema { output } => {
            let schema = zem_grid::config::generate_json_schema()?;
            match output {
                Some(path) => {
                    std::fs::write(path, &schema)?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => {
                    println!("{schema}");
                }
            }
            Ok(())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = load_config(&cli)?;
                let yaml = serde_yaml::to_string(&config).context("failed to serialize config")?;
                print!("{yaml}");
                Ok(())
            }
            ConfigAction::Path => {
                match zem_grid::config::discover_config_file(cli.config.as_deref()) {
                    Some(path) => eprintln!("Active config file: {}", path.display()),
                    None => eprintln!("No config file found."),
                }
                Ok(())
            }
            ConfigAction::Init => {
                let target = std::env::current_dir()
                    .context("cannot determine current directory")?
                    .join(".zem-grid.yaml");
                if target.exists() {
                    anyhow::bail!(
                        "{} already exists. Remove it first to re-initialize.",
                        target.display()
                    );
                }
                let content = zem_grid::config::generate_example_config();
                std::fs::write(&target, content)
                    .with_context(|| format!("failed to write {}", target.display()))?;
                eprintln!("Created {}", target.display());
                Ok(())
            }
        },
    }
}
