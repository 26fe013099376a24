//! ABI shapes of user-encrypted (wire) and ground-truth handles.

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{sol, SolValue};

use super::types::EncryptedKind;
use crate::error::SecureComputeError;

pub const WORD: usize = 32;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct ItBool { uint256 ciphertext; bytes signature; }

    #[derive(Debug, PartialEq, Eq)]
    struct ItUint8 { uint256 ciphertext; bytes signature; }

    #[derive(Debug, PartialEq, Eq)]
    struct ItUint16 { uint256 ciphertext; bytes signature; }

    #[derive(Debug, PartialEq, Eq)]
    struct ItUint32 { uint256 ciphertext; bytes signature; }

    #[derive(Debug, PartialEq, Eq)]
    struct ItUint64 { uint256 ciphertext; bytes signature; }

    #[derive(Debug, PartialEq, Eq)]
    struct CtUint128 { uint256 high; uint256 low; }

    #[derive(Debug, PartialEq, Eq)]
    struct ItUint128 { CtUint128 ciphertext; bytes[] signature; }

    #[derive(Debug, PartialEq, Eq)]
    struct CtUint256 { CtUint128 high; CtUint128 low; }

    #[derive(Debug, PartialEq, Eq)]
    struct ItUint256 { CtUint256 ciphertext; bytes[] signature; }

    #[derive(Debug, PartialEq, Eq)]
    struct CtString { uint256[] value; }

    #[derive(Debug, PartialEq, Eq)]
    struct ItString { CtString ciphertext; bytes[] signature; }

    #[derive(Debug, PartialEq, Eq)]
    struct GtUint128 { uint256 high; uint256 low; }

    #[derive(Debug, PartialEq, Eq)]
    struct GtUint256 { GtUint128 high; GtUint128 low; }

    #[derive(Debug, PartialEq, Eq)]
    struct GtString { uint256[] value; }
}

/// Decoded user-encrypted value handed to the secure-compute validator.
///
/// Wide integers are flattened most-significant limb first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireHandle {
    pub kind: EncryptedKind,
    pub ciphertext: Vec<U256>,
    pub signatures: Vec<Bytes>,
}

macro_rules! scalar_handle {
    ($ty:ty, $kind:expr, $raw:expr) => {{
        let value = <$ty>::abi_decode($raw)?;
        WireHandle {
            kind: $kind,
            ciphertext: vec![value.ciphertext],
            signatures: vec![value.signature],
        }
    }};
}

/// Decodes the `abi.encode` form of a wire value.
pub fn decode_wire(kind: EncryptedKind, raw: &[u8]) -> Result<WireHandle, alloy_sol_types::Error> {
    let handle = match kind {
        EncryptedKind::Bool => scalar_handle!(ItBool, kind, raw),
        EncryptedKind::Uint8 => scalar_handle!(ItUint8, kind, raw),
        EncryptedKind::Uint16 => scalar_handle!(ItUint16, kind, raw),
        EncryptedKind::Uint32 => scalar_handle!(ItUint32, kind, raw),
        EncryptedKind::Uint64 => scalar_handle!(ItUint64, kind, raw),
        EncryptedKind::Uint128 => {
            let value = ItUint128::abi_decode(raw)?;
            WireHandle {
                kind,
                ciphertext: vec![value.ciphertext.high, value.ciphertext.low],
                signatures: value.signature,
            }
        }
        EncryptedKind::Uint256 => {
            let value = ItUint256::abi_decode(raw)?;
            let CtUint256 { high, low } = value.ciphertext;
            WireHandle {
                kind,
                ciphertext: vec![high.high, high.low, low.high, low.low],
                signatures: value.signature,
            }
        }
        EncryptedKind::String => {
            let value = ItString::abi_decode(raw)?;
            WireHandle {
                kind,
                ciphertext: value.ciphertext.value,
                signatures: value.signature,
            }
        }
    };
    Ok(handle)
}

/// Encodes validated limbs as `abi.encode(gtValue)`.
pub fn encode_ground_truth(
    kind: EncryptedKind,
    limbs: &[U256],
) -> Result<Vec<u8>, SecureComputeError> {
    if let Some(expected) = kind.limbs() {
        if limbs.len() != expected {
            return Err(SecureComputeError::MalformedHandle(format!(
                "{kind:?} ground truth needs {expected} limbs, got {}",
                limbs.len()
            )));
        }
    }
    let encoded = match kind {
        EncryptedKind::Bool
        | EncryptedKind::Uint8
        | EncryptedKind::Uint16
        | EncryptedKind::Uint32
        | EncryptedKind::Uint64 => limbs[0].abi_encode(),
        EncryptedKind::Uint128 => GtUint128 {
            high: limbs[0],
            low: limbs[1],
        }
        .abi_encode(),
        EncryptedKind::Uint256 => GtUint256 {
            high: GtUint128 {
                high: limbs[0],
                low: limbs[1],
            },
            low: GtUint128 {
                high: limbs[2],
                low: limbs[3],
            },
        }
        .abi_encode(),
        EncryptedKind::String => GtString {
            value: limbs.to_vec(),
        }
        .abi_encode(),
    };
    Ok(encoded)
}

/// Big-endian 32-byte word holding `value`.
pub fn word(value: usize) -> [u8; WORD] {
    U256::from(value).to_be_bytes::<WORD>()
}
