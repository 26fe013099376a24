//! Inbox Relay Service
//!
//! Links two EVM Inbox deployments: polls each chain's outgoing requests and
//! delivers them to the other chain through `batchProcessRequests`, and
//! returns delivery errors to the chain that sent the failed request.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: This service holds a relayer key authorized to deliver batches.
//! Ensure proper key management and access controls for production use.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use inbox_gmp::config::{Config, CONFIG_PATH_ENV};
use inbox_gmp::crypto::CryptoService;
use inbox_gmp::relay::{EvmInboxClient, InboxRelay, InboxRelayConfig};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

/// Main application entry point.
///
/// This function:
/// 1. Initializes logging and tracing
/// 2. Loads configuration from TOML file
/// 3. Builds one JSON-RPC client per chain
/// 4. Runs the relay until shutdown
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Inbox Relay Service");

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("Inbox Relay Service");
        println!();
        println!("Usage: inbox-relay [OPTIONS]");
        println!();
        println!("Options:");
        println!("  --config <path>   Use custom config file path");
        println!("  --help, -h        Show this help message");
        println!();
        println!("Environment variables:");
        println!("  {}       Path to config file (overridden by --config)", CONFIG_PATH_ENV);
        println!("  INBOX_RELAY__<SECTION>__<KEY>  Override a single config value");
        println!("  RUST_LOG                      Log filter (default: info)");
        return Ok(());
    }

    let mut config_path = None;
    let mut i = 1; // Skip program name
    while i < args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            config_path = Some(args[i + 1].clone());
            i += 1;
        }
        i += 1;
    }

    if let Some(path) = config_path {
        std::env::set_var(CONFIG_PATH_ENV, &path);
        info!("Using custom config: {}", path);
    }

    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let crypto_service = CryptoService::new(&config.relayer)?;
    let chain_a = EvmInboxClient::new(&config.chain_a, &config.relayer, crypto_service.clone())?;
    let chain_b = EvmInboxClient::new(&config.chain_b, &config.relayer, crypto_service)?;
    info!(
        "Relaying between '{}' ({}) and '{}' ({}) as {}",
        config.chain_a.name,
        config.chain_a.chain_id,
        config.chain_b.name,
        config.chain_b.chain_id,
        chain_a.relayer_address()
    );

    let relay = InboxRelay::new(
        InboxRelayConfig::from_config(&config),
        Arc::new(chain_a),
        Arc::new(chain_b),
    );

    // Run the relay (this blocks until shutdown)
    relay.run().await
}
