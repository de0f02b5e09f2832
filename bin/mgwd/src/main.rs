//! ---
//! mgw_section: "01-core-functionality"
//! mgw_subsection: "binary"
//! mgw_type: "source"
//! mgw_scope: "code"
//! mgw_description: "Binary entrypoint for the MGW daemon."
//! mgw_version: "v0.1.0"
//! mgw_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mgw_api::{spawn_api_server, ApiServer, GatewayState};
use mgw_common::config::AppConfig;
use mgw_common::logging::init_tracing;
use mgw_datalayer::DataLayerClient;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "MGW motor gateway daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the API listen address")]
    listen: Option<SocketAddr>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the gateway")]
    Run,
    #[command(about = "Resolve and print the effective configuration, then exit")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.prod.toml"));
    candidates.push(PathBuf::from("configs/example.dev.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    config.apply_env_overrides()?;
    if let Some(listen) = cli.listen {
        config.api.listen = listen;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config, loaded.source).await,
        Commands::CheckConfig => {
            match &loaded.source {
                Some(path) => println!("# source: {}", path.display()),
                None => println!("# source: built-in defaults"),
            }
            let rendered = toml::to_string_pretty(&config)
                .context("failed to render effective configuration")?;
            print!("{rendered}");
            Ok(())
        }
    }
}

async fn run_daemon(config: AppConfig, config_path: Option<PathBuf>) -> Result<()> {
    init_tracing("mgwd", &config.logging)?;
    if let Some(path) = &config_path {
        info!(config_path = %path.display(), "configuration loaded");
    } else {
        info!("no configuration file found; running on defaults and environment overrides");
    }
    if !config.controller.verify_tls {
        warn!("controller TLS certificate verification is DISABLED");
    }

    let client = DataLayerClient::new(&config.controller)?;

    let static_dir = config.api.static_dir.clone().and_then(|dir| {
        if dir.is_dir() {
            Some(dir)
        } else {
            warn!(static_dir = %dir.display(), "static_dir not found; serving API without assets");
            None
        }
    });

    let state = Arc::new(GatewayState::new(client));
    let server: ApiServer = spawn_api_server(state, config.api.listen, static_dir)?;
    info!(address = %server.addr(), controller = %config.controller.base_url, "gateway running; waiting for termination signal");

    signal::ctrl_c().await?;
    info!("ctrl-c received; shutting down");
    server.shutdown().await?;

    Ok(())
}
