//! Argument codec: tagged argument payloads and their re-encoding into
//! ABI calldata.
//!
//! A `MethodCall` stores each argument as its own `abi.encode` output plus a
//! type tag. Re-encoding walks the tags, upgrades user-encrypted handles via
//! the secure-compute validator, and lays the results out as standard ABI
//! head/tail calldata behind the selector.

pub mod abi;
pub mod builder;
pub mod reencode;
pub mod types;

use sha3::{Digest, Keccak256};

pub use abi::WireHandle;
pub use builder::MethodCallBuilder;
pub use reencode::reencode;
pub use types::{DataType, EncryptedKind};

use crate::types::Selector;

/// First four bytes of `keccak256(signature)`.
pub fn selector_of(signature: &str) -> Selector {
    Selector::from_slice(&Keccak256::digest(signature.as_bytes())[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_of_known_signature() {
        assert_eq!(
            selector_of("transfer(address,uint256)"),
            Selector::from([0xa9, 0x05, 0x9c, 0xbb])
        );
    }
}
