//! Get Relay Address
//!
//! Reads the relay configuration and prints the EVM address of the
//! configured relayer key.
//!
//! ## Usage
//!
//! ```bash
//! INBOX_RELAY_CONFIG_PATH=config/inbox-relay.toml cargo run --bin get_relay_address
//! ```

use anyhow::Result;
use inbox_gmp::config::Config;
use inbox_gmp::crypto::CryptoService;

fn main() -> Result<()> {
    let config = Config::load()?;
    let crypto = CryptoService::new(&config.relayer)?;

    println!("Relayer address derived from {}:", config.relayer.private_key_env);
    println!();
    println!("INBOX_RELAYER_ADDRESS={}", crypto.evm_address());
    println!();
    println!(
        "Authorize it on '{}' ({}) and '{}' ({}).",
        config.chain_a.name, config.chain_a.inbox_addr, config.chain_b.name, config.chain_b.inbox_addr
    );

    Ok(())
}
