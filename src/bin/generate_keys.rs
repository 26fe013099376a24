//! Relayer Key Generation Utility
//!
//! Generates a fresh secp256k1 key for the inbox relay and prints the EVM
//! address that must be authorized on both Inbox deployments.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin generate_keys
//! ```

use inbox_gmp::crypto::CryptoService;

fn main() {
    let crypto = CryptoService::generate();

    println!("Generated relayer key:");
    println!();
    println!("INBOX_RELAYER_PRIVATE_KEY={}", crypto.private_key_base64());
    println!("INBOX_RELAYER_ADDRESS={}", crypto.evm_address());
    println!();
    println!("Export the private key in the environment variable named by relayer.private_key_env,");
    println!("then authorize the address on both Inbox contracts (addAuthorized).");
}
