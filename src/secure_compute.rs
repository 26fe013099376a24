//! Secure-compute validator boundary.
//!
//! The codec hands every user-encrypted argument to a `SecureCompute`
//! implementation and embeds whatever ground-truth limbs it returns. The
//! computation behind a handle is opaque to this crate.

use alloy_primitives::{Bytes, B256, U256};
use sha3::{Digest, Keccak256};
use tracing::debug;

use crate::codec::{EncryptedKind, WireHandle};
use crate::error::SecureComputeError;

pub trait SecureCompute: Send + Sync {
    /// Validates a wire handle and returns one ground-truth limb per ciphertext limb.
    fn validate(&self, handle: &WireHandle) -> Result<Vec<U256>, SecureComputeError>;
}

/// Deterministic validator keyed by a 32-byte network key.
///
/// A limb's signature is `keccak256(key ‖ domain ‖ limb)` and its ground-truth
/// handle is `keccak256("gt" ‖ domain ‖ limb)`.
#[derive(Debug, Clone)]
pub struct LocalSecureCompute {
    network_key: B256,
}

impl LocalSecureCompute {
    pub fn new(network_key: B256) -> Self {
        Self { network_key }
    }

    pub fn sign_limb(&self, kind: EncryptedKind, limb: U256) -> Bytes {
        let mut hasher = Keccak256::new();
        hasher.update(self.network_key.as_slice());
        hasher.update([kind.domain()]);
        hasher.update(limb.to_be_bytes::<32>());
        Bytes::copy_from_slice(&hasher.finalize())
    }

    /// Signs every limb, producing a handle this validator accepts.
    pub fn seal(&self, kind: EncryptedKind, ciphertext: Vec<U256>) -> WireHandle {
        let signatures = ciphertext
            .iter()
            .map(|limb| self.sign_limb(kind, *limb))
            .collect();
        WireHandle {
            kind,
            ciphertext,
            signatures,
        }
    }

    pub fn ground_truth(kind: EncryptedKind, limb: U256) -> U256 {
        let mut hasher = Keccak256::new();
        hasher.update(b"gt");
        hasher.update([kind.domain()]);
        hasher.update(limb.to_be_bytes::<32>());
        U256::from_be_slice(&hasher.finalize())
    }
}

impl SecureCompute for LocalSecureCompute {
    fn validate(&self, handle: &WireHandle) -> Result<Vec<U256>, SecureComputeError> {
        if handle.signatures.len() != handle.ciphertext.len() {
            return Err(SecureComputeError::SignatureCount {
                limbs: handle.ciphertext.len(),
                signatures: handle.signatures.len(),
            });
        }
        if let Some(expected) = handle.kind.limbs() {
            if handle.ciphertext.len() != expected {
                return Err(SecureComputeError::MalformedHandle(format!(
                    "{:?} handle needs {expected} limbs, got {}",
                    handle.kind,
                    handle.ciphertext.len()
                )));
            }
        }

        for (index, (limb, signature)) in handle
            .ciphertext
            .iter()
            .zip(&handle.signatures)
            .enumerate()
        {
            if self.sign_limb(handle.kind, *limb) != *signature {
                return Err(SecureComputeError::InvalidSignature(index));
            }
        }

        debug!(
            "Validated {:?} handle with {} limbs",
            handle.kind,
            handle.ciphertext.len()
        );
        Ok(handle
            .ciphertext
            .iter()
            .map(|limb| Self::ground_truth(handle.kind, *limb))
            .collect())
    }
}
