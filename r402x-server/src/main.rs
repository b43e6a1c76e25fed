//! x402 pay-and-execute HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p r402x-server --release
//!
//! # Run with custom config path
//! r402x-server --config /path/to/config.toml
//!
//! # Configure logging level
//! RUST_LOG=debug r402x-server
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST` - Override bind address (default: `0.0.0.0`)
//! - `PORT` - Override port (default: `4402`)
//! - `RUST_LOG` - Log level filter (default: `info`)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use alloy_network::EthereumWallet;
use alloy_provider::ProviderBuilder;
use axum::http::Method;
use clap::Parser;
use r402x::registry::{ServiceRegistry, StaticRegistry};
use r402x_evm::signer::SigningStrategy;
use r402x_evm::{EvmChainClient, Executor};
use r402x_http::{FacilitatorClient, FacilitatorPayment, HttpServiceRegistry};
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use r402x_server::config::ServerConfig;
use r402x_server::{AppState, app_router};

/// Command-line options.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load_from(&cli.config)?;
    tracing::info!(
        path = %cli.config.display(),
        host = %config.host,
        port = config.port,
        "Loaded configuration"
    );

    let signer = config.signer()?;
    let payer = signer.address();
    let rpc_url = config.rpc_url()?;
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer.inner().clone()))
        .connect_http(rpc_url);
    let chain = EvmChainClient::new(provider)
        .with_confirmations(config.confirmations)
        .with_receipt_timeout(config.receipt_timeout());

    let registry: Arc<dyn ServiceRegistry> = match &config.registry_url {
        Some(url) => {
            tracing::info!(%url, "Using remote service registry");
            Arc::new(
                HttpServiceRegistry::try_from(url.as_str())?
                    .with_cache_ttl(config.registry_cache_ttl()),
            )
        }
        None => {
            if config.services.is_empty() {
                tracing::warn!("No registry_url and no inline services configured");
            }
            tracing::info!(services = config.services.len(), "Using inline services");
            Arc::new(StaticRegistry::new(config.services.clone()))
        }
    };

    let facilitator = match &config.facilitator {
        Some(section) => {
            let client = FacilitatorClient::try_from(section.url.as_str())?;
            tracing::info!(url = %section.url, network = %section.settings.network, "Facilitator payments enabled");
            Some(Arc::new(FacilitatorPayment::new(client, section.settings.clone())))
        }
        None => None,
    };

    let executor = Executor::new(registry, Arc::new(chain)).with_config(config.executor_config());
    let state = AppState {
        executor: Arc::new(executor),
        signer: Arc::new(signer),
        facilitator,
    };

    let app = app_router(state).layer(TraceLayer::new_for_http()).layer(
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(cors::Any),
    );

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%payer, "Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM (Unix) to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        let sigterm = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::select! {
            () = ctrl_c => tracing::info!("Received Ctrl-C, shutting down..."),
            () = sigterm => tracing::info!("Received SIGTERM, shutting down..."),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
        tracing::info!("Received Ctrl-C, shutting down...");
    }
}
