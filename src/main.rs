//! Sinta-Harvest main entry point
//!
//! This is the command-line interface for the Sinta-Harvest record fetcher.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use sinta_harvest::cache::EnumerationEntry;
use sinta_harvest::config::{load_config_with_hash, validate, Config};
use sinta_harvest::{format_output, Identifier, Identifiers, OutputFormat, SintaClient};
use tracing_subscriber::EnvFilter;

const DEFAULT_DOMAIN: &str = "https://sinta.kemdikbud.go.id";

/// Sinta-Harvest: a concurrent record fetcher for the SINTA directory
///
/// Fetches author, affiliation and department profiles and prints them as
/// JSON, or as a markdown table with `--format dataframe`.
#[derive(Parser, Debug)]
#[command(name = "sinta-harvest")]
#[command(version)]
#[command(about = "A concurrent record fetcher for the SINTA directory", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Directory base URL; overrides the configured domain
    #[arg(long, value_name = "URL", global = true)]
    domain: Option<String>,

    /// Result shape: dict, list or dataframe
    #[arg(short, long, default_value_t = OutputFormat::Dict, global = true)]
    format: OutputFormat,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch author profiles
    Authors {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Fetch affiliation profiles
    Affiliations {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },

    /// Fetch department profiles under one affiliation
    Departments {
        /// Parent affiliation id
        #[arg(short, long, value_name = "ID")]
        affiliation: String,

        /// Read and write the department listing in this directory
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,

        /// Department codes
        #[arg(required = true, value_name = "CODE")]
        ids: Vec<String>,
    },

    /// Inspect or clear cached department listings
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Print the department listing of an affiliation, crawling it if needed
    Show { affiliation: String },

    /// Remove the cached listing of an affiliation
    Clear { affiliation: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;
    let client = SintaClient::new(&config).context("Failed to set up client")?;
    let format = cli.format;

    match cli.command {
        Command::Authors { ids } => {
            let output = client.authors(Identifiers::parse(&ids)?, format).await?;
            print_output(&output)?;
        }
        Command::Affiliations { ids } => {
            let output = client
                .affiliations(Identifiers::parse(&ids)?, format)
                .await?;
            print_output(&output)?;
        }
        Command::Departments {
            affiliation,
            cache_dir,
            ids,
        } => {
            let affiliation = Identifier::new(&affiliation)?;
            let output = client
                .departments(
                    Identifiers::parse(&ids)?,
                    &affiliation,
                    format,
                    cache_dir.as_deref(),
                )
                .await?;
            print_output(&output)?;
        }
        Command::Cache { action } => handle_cache(&client, action, format).await?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sinta_harvest=info,warn"),
            1 => EnvFilter::new("sinta_harvest=debug,info"),
            2 => EnvFilter::new("sinta_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Records go to stdout; logs stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file if one was given, then applies `--domain`
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::for_domain(DEFAULT_DOMAIN),
    };

    if let Some(domain) = &cli.domain {
        config.source.domain = domain.clone();
        validate(&config)?;
    }

    Ok(config)
}

async fn handle_cache(
    client: &SintaClient,
    action: CacheAction,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match action {
        CacheAction::Show { affiliation } => {
            let affiliation = Identifier::new(&affiliation)?;
            let table = client.enumerate_departments(&affiliation).await?;
            tracing::info!(
                "{} departments for affiliation {} in {}",
                table.len(),
                affiliation,
                client.store().location()
            );
            let rows: Vec<EnumerationEntry> = table.entries().cloned().collect();
            print_output(&format_output(rows, format)?)?;
        }
        CacheAction::Clear { affiliation } => {
            let affiliation = Identifier::new(&affiliation)?;
            if client.forget_departments(&affiliation)? {
                println!("Cleared cached departments for affiliation {}", affiliation);
            } else {
                println!("No cached departments for affiliation {}", affiliation);
            }
        }
    }
    Ok(())
}

fn print_output<T: Serialize>(output: &sinta_harvest::Output<T>) -> anyhow::Result<()> {
    if output.is_empty() {
        tracing::warn!("No records were fetched");
    }
    println!("{}", output.render()?);
    Ok(())
}
