//! Command-line front end: compare address lists and geocode the leftovers.

mod app;
mod config;
mod input;
mod report;

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use sitematch_core::{BatchProgress, normalize_detailed};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{App, SideMaps};
use crate::config::AppConfig;
use crate::report::{MatchReport, OutputFormat, write_coordinates};

#[derive(Debug, Parser)]
#[command(name = "sitematch", version, about = "Reconcile address lists and geocode the leftovers")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "SITEMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Geoapify API key
    #[arg(long, global = true, env = "GEOAPIFY_API_KEY", hide_env_values = true)]
    geoapify_key: Option<String>,

    /// Mapbox access token
    #[arg(long, global = true, env = "MAPBOX_ACCESS_TOKEN", hide_env_values = true)]
    mapbox_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Match a source address list against a target list; Ctrl-C stops geocoding early
    Match {
        /// Source list, one address per line
        source: PathBuf,
        /// Target list, one address per line
        target: PathBuf,
        /// Property ids as `address<TAB>id` lines
        #[arg(long)]
        properties: Option<PathBuf>,
        /// Tenant names as `address<TAB>tenant` lines
        #[arg(long)]
        tenants: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Geocode every address that found no counterpart
        #[arg(long)]
        geocode_missing: bool,
    },
    /// Print the canonical form of each address
    Normalize {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Geocode a single address
    Geocode {
        address: String,
        /// Business at the address, used for query hints
        #[arg(long)]
        business: Option<String>,
    },
    /// Geocode every address in a file; Ctrl-C stops early
    Batch { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitematch_cli=info,sitematch_core=info".into()),
        )
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?
        .with_credentials(cli.geoapify_key, cli.mapbox_token);

    if let Command::Normalize { addresses } = &cli.command {
        return normalize(addresses);
    }

    let client = Client::builder()
        .user_agent(config.geocoding.user_agent.as_str())
        .build()
        .context("cannot build HTTP client")?;
    let app = App::new(&config, &client);

    match cli.command {
        Command::Match {
            source,
            target,
            properties,
            tenants,
            format,
            geocode_missing,
        } => {
            let source = input::read_addresses(&source)?;
            let target = input::read_addresses(&target)?;
            let side_maps = SideMaps {
                property_ids: properties
                    .as_deref()
                    .map(input::read_side_map)
                    .transpose()?
                    .unwrap_or_default(),
                tenants: tenants
                    .as_deref()
                    .map(input::read_side_map)
                    .transpose()?
                    .unwrap_or_default(),
            };

            let records = app.compare(&source, &target, &side_maps);
            let geocoded = if geocode_missing {
                let (cancel, ctrl_c) = interrupt_watch("geocoding of leftovers");
                let geocoded = app.geocode_missing(&records, cancel).await;
                ctrl_c.abort();
                geocoded
            } else {
                HashMap::new()
            };

            let mut out = io::stdout().lock();
            MatchReport::new(&records, &geocoded).write(&mut out, format)?;
        }
        Command::Geocode { address, business } => {
            let coordinates = app
                .service
                .enhanced_geocode(&address, business.as_deref())
                .await;
            if let Some(index) = app.service.last_used_index().await {
                info!(provider_index = index, "last successful provider");
            }
            write_coordinates(&mut io::stdout().lock(), &address, coordinates)?;
        }
        Command::Batch { file } => batch(&app, &input::read_addresses(&file)?).await?,
        Command::Normalize { .. } => {}
    }

    Ok(())
}

fn normalize(addresses: &[String]) -> Result<()> {
    let mut out = io::stdout().lock();
    for address in addresses {
        let normalized = normalize_detailed(address);
        match &normalized.unit {
            Some(unit) => writeln!(out, "{}\t[{unit}]", normalized.canonical)?,
            None => writeln!(out, "{}", normalized.canonical)?,
        }
    }
    Ok(())
}

/// Cancellation flag flipped by Ctrl-C. Abort the returned handle once the work is done.
fn interrupt_watch(work: &'static str) -> (watch::Receiver<bool>, JoinHandle<()>) {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(work, "interrupt received, stopping");
            cancel_tx.send_replace(true);
        }
    });
    (cancel_rx, ctrl_c)
}

async fn batch(app: &App, addresses: &[String]) -> Result<()> {
    let (cancel_rx, ctrl_c) = interrupt_watch("batch geocoding");

    let mut last = BatchProgress::default();
    let results = app
        .service
        .batch_geocode(addresses, cancel_rx, |progress| last = progress)
        .await;
    ctrl_c.abort();

    if last.processed < last.total {
        warn!(
            processed = last.processed,
            total = last.total,
            "batch stopped early, remaining addresses were not attempted"
        );
    }

    let mut out = io::stdout().lock();
    let mut written = HashSet::new();
    for address in addresses {
        let Some(coordinates) = results.get(address) else {
            continue;
        };
        if written.insert(address.as_str()) {
            write_coordinates(&mut out, address, *coordinates)?;
        }
    }
    Ok(())
}
