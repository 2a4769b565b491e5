//! Filedrop server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use filedrop_core::config::AppConfig;
use filedrop_server::{AppState, create_router, spawn_sweepers};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filedrop - an ephemeral file sharing server
#[derive(Parser, Debug)]
#[command(name = "filedropd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "FILEDROP_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Filedrop v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. Every field has a default, so a missing file just
    // means defaults plus whatever FILEDROP_ env vars provide.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("FILEDROP_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize storage backend
    let storage = filedrop_storage::from_config(&config.storage)
        .await
        .context("failed to initialize storage")?;
    tracing::info!("Storage backend initialized");

    // Verify storage connectivity before accepting requests so the server
    // never reports healthy while its backing store is unusable.
    storage
        .health_check()
        .await
        .context("storage health check failed")?;
    tracing::info!("Storage backend connectivity verified");

    let state = AppState::new(config.clone(), storage);

    // Spawn the hard-expiry and idle-eviction sweeps
    let (_expiry_handle, _idle_handle) = spawn_sweepers(&state);
    tracing::info!(
        expiry_interval_secs = config.retention.expiry_sweep_interval_secs,
        idle_interval_secs = config.retention.idle_sweep_interval_secs,
        ttl_secs = config.retention.ttl_secs,
        "Eviction sweeps spawned"
    );

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
