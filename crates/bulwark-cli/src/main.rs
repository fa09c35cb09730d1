//! Bulwark CLI.
//!
//! Runs lookups through the fallback orchestrator against file-backed
//! catalogs, mostly useful for exercising a configuration:
//!
//! ```text
//! bulwark --config bulwark.yaml lookup ad-1 ad-2 --secondary items.yaml
//! bulwark --config bulwark.yaml check-config
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bulwark_core::AccessConfig;
use bulwark_runtime::{CatalogSource, FallbackOrchestrator};

#[derive(Parser, Debug)]
#[command(
    name = "bulwark",
    version,
    about = "Cache-fronted item lookup with primary/secondary fallback"
)]
struct Cli {
    /// Config file (YAML or JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up one or more items
    Lookup {
        /// Item ids
        #[arg(required = true)]
        ids: Vec<String>,

        /// Catalog served by the primary source; without it every primary call fails
        #[arg(long)]
        primary: Option<PathBuf>,

        /// Catalog served by the secondary source
        #[arg(long)]
        secondary: PathBuf,

        /// Override retry_count from the config
        #[arg(long)]
        retry_count: Option<u32>,

        /// Print access counters after the lookups
        #[arg(long)]
        stats: bool,
    },

    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Lookup {
            ids,
            primary,
            secondary,
            retry_count,
            stats,
        } => {
            let mut config = config;
            if let Some(retry_count) = retry_count {
                config.retry_count = retry_count;
            }
            lookup(config, &ids, primary.as_deref(), &secondary, stats).await
        }
        Command::CheckConfig => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AccessConfig> {
    let config = match path {
        Some(path) => AccessConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AccessConfig::default(),
    };

    config
        .with_env_overrides()
        .context("Invalid configuration override")
}

fn load_catalog(name: &str, path: Option<&Path>) -> Result<CatalogSource<JsonValue>> {
    match path {
        Some(path) => CatalogSource::from_file(name, path)
            .with_context(|| format!("Failed to load {} catalog", name)),
        None => Ok(CatalogSource::new(name)),
    }
}

async fn lookup(
    config: AccessConfig,
    ids: &[String],
    primary: Option<&Path>,
    secondary: &Path,
    show_stats: bool,
) -> Result<()> {
    let primary = load_catalog("primary", primary)?;
    let secondary = load_catalog("secondary", Some(secondary))?;

    let orchestrator = FallbackOrchestrator::<JsonValue>::builder()
        .primary(Arc::new(primary))
        .secondary(Arc::new(secondary))
        .config(config)
        .build()
        .context("Failed to build orchestrator")?;

    let mut failed = 0usize;
    for id in ids {
        match orchestrator.get(id).await {
            Ok(item) => println!("{}", json!({ "id": id, "found": item.is_some(), "item": item })),
            Err(e) => {
                tracing::error!(id = %id, error = %e, "Lookup failed");
                failed += 1;
            }
        }
    }

    if show_stats {
        println!("{}", serde_json::to_string_pretty(&orchestrator.stats())?);
    }

    if failed > 0 {
        bail!("{} of {} lookups failed", failed, ids.len());
    }

    Ok(())
}
