// SPDX-License-Identifier: MIT OR Apache-2.0
//! `rsp` — inspect the launch specifications the proxy adapters hand to the
//! notebook host, without spawning anything.

#![deny(unsafe_code)]

mod format;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use format::OutputFormat;
use rsp_core::{LaunchSpec, RunContext, ServerAdapter};
use rsp_rstudio::{RResolution, RStudioAdapter};
use rsp_shiny::ShinyAdapter;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "rsp",
    version,
    about = "Inspect rsession-proxy launch specifications"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the launcher entries of all registered servers.
    List {
        /// Output format.
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Build and print the launch specification for one server.
    Spec {
        /// Which server to build the spec for.
        server: ServerKind,
        /// TCP port the host would proxy to.
        #[arg(long)]
        port: u16,
        /// Output format.
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Persist a rendered config file instead of removing it on exit.
        #[arg(long)]
        keep: bool,
    },
    /// Report which server executables are currently discoverable.
    Check,
}

/// Servers this workspace ships adapters for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ServerKind {
    Rstudio,
    Shiny,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = rsp_config::load_config(cli.config.as_deref())
        .context("failed to load configuration")?;
    init_tracing(config.log_level.as_deref());

    for warning in rsp_config::validate_config(&config)
        .context("configuration failed validation")?
    {
        warn!(target: "rsp.config", "{warning}");
    }

    match cli.command {
        Commands::List { format } => cmd_list(&config, format),
        Commands::Spec {
            server,
            port,
            format,
            keep,
        } => cmd_spec(&config, server, port, format, keep),
        Commands::Check => cmd_check(&config),
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level.unwrap_or("info")))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn adapters(config: &rsp_config::ProxyConfig) -> Vec<Box<dyn ServerAdapter>> {
    vec![
        Box::new(RStudioAdapter::from_config(config)),
        Box::new(ShinyAdapter::from_config(config)),
    ]
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct EntryRow {
    server: String,
    title: String,
    icon_path: PathBuf,
}

fn cmd_list(config: &rsp_config::ProxyConfig, format: OutputFormat) -> Result<()> {
    let rows: Vec<EntryRow> = adapters(config)
        .iter()
        .map(|adapter| {
            let entry = adapter.launcher_entry();
            EntryRow {
                server: adapter.name().to_string(),
                title: entry.title,
                icon_path: entry.icon_path,
            }
        })
        .collect();

    if format.is_json() {
        println!("{}", format.to_json(&rows)?);
    } else {
        for row in &rows {
            println!("{:<10} {} ({})", row.server, row.title, row.icon_path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// spec
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SpecView {
    server: String,
    spec: LaunchSpec,
    /// Present only when `--keep` persisted a rendered config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<PathBuf>,
}

fn cmd_spec(
    config: &rsp_config::ProxyConfig,
    server: ServerKind,
    port: u16,
    format: OutputFormat,
    keep: bool,
) -> Result<()> {
    let adapter: Box<dyn ServerAdapter> = match server {
        ServerKind::Rstudio => Box::new(RStudioAdapter::from_config(config)),
        ServerKind::Shiny => Box::new(ShinyAdapter::from_config(config)),
    };

    let ctx = RunContext::from_env().context("failed to snapshot the run context")?;
    let launch = adapter
        .launch(&ctx, port)
        .with_context(|| format!("failed to build a launch spec for {}", adapter.name()))?;

    let (spec, guard) = launch.into_parts();
    let config_file = match (keep, guard) {
        (true, Some(guard)) => Some(
            guard
                .keep()
                .context("failed to persist the rendered config file")?,
        ),
        // The guard drops here and the rendered file goes with it, exactly
        // as when a host drops a finished launch.
        (_, _) => None,
    };

    let view = SpecView {
        server: adapter.name().to_string(),
        spec,
        config_file,
    };

    if format.is_json() {
        println!("{}", format.to_json(&view)?);
    } else {
        println!("server:  {}", view.server);
        println!("program: {}", view.spec.program);
        for arg in &view.spec.args {
            println!("arg:     {arg}");
        }
        for (key, value) in &view.spec.env {
            println!("env:     {key}={value}");
        }
        if let Some(path) = &view.config_file {
            println!("config:  {} (kept)", path.display());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

fn cmd_check(config: &rsp_config::ProxyConfig) -> Result<()> {
    let rstudio = RStudioAdapter::from_config(config);

    match rstudio.locate_rserver() {
        Ok(path) => println!("rserver: {}", path.display()),
        Err(e) => println!("rserver: not found ({e})"),
    }

    match rsp_which::which(rsp_shiny::LAUNCHER_BIN) {
        Some(path) => println!("{}: {}", rsp_shiny::LAUNCHER_BIN, path.display()),
        None => println!("{}: not found in PATH", rsp_shiny::LAUNCHER_BIN),
    }

    match rstudio.resolve_r() {
        RResolution::Resolved(path) => println!("R interpreter: {}", path.display()),
        RResolution::Fallback { reason } => {
            println!("R interpreter: {} ({reason})", rsp_rstudio::FALLBACK_R);
        }
    }

    Ok(())
}
