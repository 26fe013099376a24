//! Configuration Management Module
//!
//! Loads the relayer configuration: the relayer key location, polling
//! parameters and the two Inbox chains the relayer links.

use std::path::Path;
use std::str::FromStr;

use alloy_primitives::Address;
use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "INBOX_RELAY_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/inbox-relay.toml";
/// Prefix of environment variables overriding individual keys, e.g. `INBOX_RELAY__RELAYER__BATCH_SIZE`.
const ENV_OVERRIDE_PREFIX: &str = "INBOX_RELAY";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Relayer key and polling settings
    pub relayer: RelayerConfig,
    /// First Inbox chain
    pub chain_a: InboxChainConfig,
    /// Second Inbox chain
    pub chain_b: InboxChainConfig,
}

/// Relayer settings.
///
/// The private key itself never lives in the config file: `private_key_env`
/// names the environment variable holding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayerConfig {
    /// Environment variable name containing the secp256k1 private key (base64 encoded)
    /// Default: "INBOX_RELAYER_PRIVATE_KEY"
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// Delay between polls in milliseconds
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Maximum number of requests per submitted batch
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// How long to wait for a submitted transaction's receipt
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
}

/// Connection details for one Inbox chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxChainConfig {
    /// Human-readable name for the chain
    pub name: String,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Chain ID (e.g., 31337 for Hardhat)
    pub chain_id: u64,
    /// Address of the Inbox contract
    pub inbox_addr: String,
}

fn default_private_key_env() -> String {
    "INBOX_RELAYER_PRIVATE_KEY".to_string()
}

fn default_polling_interval_ms() -> u64 {
    2000
}

fn default_batch_size() -> u64 {
    16
}

fn default_receipt_timeout_ms() -> u64 {
    30_000
}

impl InboxChainConfig {
    /// Parses `inbox_addr` as a 20-byte hex address.
    pub fn inbox_address(&self) -> anyhow::Result<Address> {
        Address::from_str(&self.inbox_addr).with_context(|| {
            format!(
                "Invalid inbox_addr '{}' for chain '{}'",
                self.inbox_addr, self.name
            )
        })
    }
}

// ============================================================================
// LOADING AND VALIDATION
// ============================================================================

impl Config {
    /// Validates cross-field constraints.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chain_a.chain_id == self.chain_b.chain_id {
            return Err(anyhow::anyhow!(
                "Configuration error: chain_a and chain_b have the same chain ID {}. Each chain must have a unique chain ID.",
                self.chain_a.chain_id
            ));
        }
        if self.relayer.batch_size == 0 {
            return Err(anyhow::anyhow!(
                "Configuration error: relayer.batch_size must be greater than zero"
            ));
        }
        self.chain_a.inbox_address()?;
        self.chain_b.inbox_address()?;
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the TOML file, applying `INBOX_RELAY__*` overrides.
    ///
    /// The path comes from `INBOX_RELAY_CONFIG_PATH`, falling back to
    /// `config/inbox-relay.toml`. A missing file is an error that points at the template.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        if !Path::new(&config_path).exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/inbox-relay.template.toml config/inbox-relay.toml\n\
                Then edit config/inbox-relay.toml with your actual values.",
                config_path
            ));
        }

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(Path::new(&config_path)))
            .add_source(
                ::config::Environment::with_prefix(ENV_OVERRIDE_PREFIX).separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration '{}'", config_path))?;
        let config: Config = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse configuration '{}'", config_path))?;
        config.validate()?;
        Ok(config)
    }

    /// Local devnet configuration: two Hardhat-style chains on adjacent ports.
    pub fn default() -> Self {
        Self {
            relayer: RelayerConfig {
                private_key_env: default_private_key_env(),
                polling_interval_ms: default_polling_interval_ms(),
                batch_size: default_batch_size(),
                receipt_timeout_ms: default_receipt_timeout_ms(),
            },
            chain_a: InboxChainConfig {
                name: "Chain A".to_string(),
                rpc_url: "http://127.0.0.1:8545".to_string(),
                chain_id: 31337,
                inbox_addr: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            },
            chain_b: InboxChainConfig {
                name: "Chain B".to_string(),
                rpc_url: "http://127.0.0.1:8546".to_string(),
                chain_id: 31338,
                inbox_addr: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            },
        }
    }
}
