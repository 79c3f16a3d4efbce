//! Presence service binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use presenced_authorities::{
    HttpCredentialIssuer, HttpDeviceStateAuthority, HttpDirectoryAuthority, HttpSessionAuthority,
    HttpTenantAuthority,
};
use presenced_core::config::AppConfig;
use presenced_server::{create_router, AppState, Initiator, ReadinessGate};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// presenced - presence snapshot service
#[derive(Parser, Debug)]
#[command(name = "presenced")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PRESENCED_CONFIG",
        default_value = "config/presenced.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("presenced v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("PRESENCED_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize the presence store
    let store = presenced_store::from_config(&config.store)
        .await
        .context("failed to initialize presence store")?;
    tracing::info!("Presence store initialized");

    // Build the authority clients
    let authorities = &config.authorities;
    let credentials = Arc::new(
        HttpCredentialIssuer::new(
            &authorities.auth_url,
            &authorities.service_id,
            &authorities.service_key,
        )
        .context("invalid auth_url")?,
    );
    let tenants = Arc::new(HttpTenantAuthority::new(&authorities.auth_url).context("invalid auth_url")?);
    let sessions =
        Arc::new(HttpSessionAuthority::new(&authorities.auth_url).context("invalid auth_url")?);
    let directory = Arc::new(
        HttpDirectoryAuthority::new(&authorities.directory_url).context("invalid directory_url")?,
    );
    let device_states = Arc::new(
        HttpDeviceStateAuthority::new(&authorities.device_state_url)
            .context("invalid device_state_url")?,
    );

    let initiator = Initiator::new(
        store.clone(),
        credentials,
        tenants,
        directory,
        sessions,
        device_states,
        config.initialization.credential_expiration_secs,
    );

    // Spawn the reconciliation loop; the gate flips once a run succeeds
    let readiness = ReadinessGate::new();
    let _init_handle = presenced_server::readiness::spawn_initialization(
        readiness.clone(),
        initiator,
        config.initialization.clone(),
    );

    let state = AppState::new(store, readiness);
    let router = create_router(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .context("invalid server.bind address")?;
    tracing::info!(bind = %addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind server address")?;
    axum::serve(listener, router)
        .await
        .context("server error")?;

    Ok(())
}
