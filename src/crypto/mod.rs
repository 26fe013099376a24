//! Cryptographic Operations Module
//!
//! Relayer key management: loading the secp256k1 key from the environment,
//! deriving its EVM address and signing transaction hashes.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: Private keys must never be exposed or logged.

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use sha3::{Digest, Keccak256};
use tracing::info;

use alloy_primitives::Address;

use crate::config::RelayerConfig;

// ============================================================================
// CRYPTOGRAPHIC SERVICE IMPLEMENTATION
// ============================================================================

/// Holds the relayer's secp256k1 key.
#[derive(Clone)]
pub struct CryptoService {
    signing_key: SigningKey,
}

impl CryptoService {
    /// Loads the key named by `config.private_key_env`.
    pub fn new(config: &RelayerConfig) -> Result<Self> {
        let private_key_b64 = std::env::var(&config.private_key_env).with_context(|| {
            format!(
                "Environment variable '{}' not set. Generate a key with: cargo run --bin generate_keys",
                config.private_key_env
            )
        })?;
        let service = Self::from_base64(&private_key_b64)?;
        info!("Crypto service initialized for relayer {}", service.evm_address());
        Ok(service)
    }

    /// Builds the service from a base64-encoded 32-byte secret.
    pub fn from_base64(private_key_b64: &str) -> Result<Self> {
        let private_key_bytes = general_purpose::STANDARD
            .decode(private_key_b64.trim())
            .context("Private key is not valid base64")?;
        Self::from_secret_bytes(&private_key_bytes)
    }

    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self> {
        if secret.len() != 32 {
            return Err(anyhow::anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                secret.len()
            ));
        }
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| anyhow::anyhow!("Failed to create ECDSA signing key: {}", e))?;
        Ok(Self { signing_key })
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn private_key_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.signing_key.to_bytes())
    }

    /// keccak256(uncompressed_pubkey[1..])[12..32]
    pub fn evm_address(&self) -> Address {
        let public_key_point = self.signing_key.verifying_key().to_encoded_point(false);
        let hash = Keccak256::digest(&public_key_point.as_bytes()[1..]);
        Address::from_slice(&hash[12..32])
    }

    /// Signs a transaction hash without any message prefix.
    ///
    /// Returns `(r, s, recovery_id)` with r and s as 32-byte big-endian values.
    pub fn sign_evm_transaction_hash(&self, tx_hash: &[u8; 32]) -> Result<([u8; 32], [u8; 32], u8)> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(tx_hash)
            .map_err(|e| anyhow::anyhow!("Failed to sign transaction hash: {}", e))?;

        let sig_bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..64]);
        Ok((r, s, recovery_id.to_byte()))
    }
}
