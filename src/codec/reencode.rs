//! Re-encoding of a `MethodCall` into ABI calldata with ground-truth handles.

use alloy_primitives::Bytes;
use tracing::debug;

use super::abi::{self, WORD};
use super::types::DataType;
use crate::error::CodecError;
use crate::secure_compute::SecureCompute;
use crate::types::MethodCall;

/// One argument after normalization.
enum Normalized {
    /// Head words written in place.
    Static(Vec<u8>),
    /// Tail payload, i.e. the `abi.encode` output without its leading offset word.
    Dynamic(Vec<u8>),
}

/// Produces `selector ‖ head ‖ tail` calldata for `call`.
///
/// Raw passthrough calls return `data` unchanged. Every user-encrypted argument
/// is validated once through `validator`.
pub fn reencode(call: &MethodCall, validator: &dyn SecureCompute) -> Result<Bytes, CodecError> {
    if call.is_raw() {
        let typed = call.datatypes.len().max(call.datalens.len());
        if typed > 0 {
            return Err(CodecError::RawCallWithArguments(typed));
        }
        return Ok(call.data.clone());
    }

    let arguments = split_arguments(call)?;
    let normalized = arguments
        .into_iter()
        .enumerate()
        .map(|(index, (data_type, raw))| normalize(index, data_type, raw, validator))
        .collect::<Result<Vec<_>, _>>()?;

    let calldata = assemble(call.selector.as_slice(), &normalized);
    debug!(
        "Re-encoded {} arguments into {} bytes of calldata",
        normalized.len(),
        calldata.len()
    );
    Ok(calldata.into())
}

/// Slices `data` by the declared lengths, requiring exact consumption.
fn split_arguments(call: &MethodCall) -> Result<Vec<(DataType, &[u8])>, CodecError> {
    if call.datatypes.len() != call.datalens.len() {
        return Err(CodecError::TableLengthMismatch {
            types: call.datatypes.len(),
            lens: call.datalens.len(),
        });
    }

    let mut rest: &[u8] = &call.data;
    let mut arguments = Vec::with_capacity(call.datatypes.len());
    for (index, (&tag, &declared)) in call.datatypes.iter().zip(&call.datalens).enumerate() {
        let data_type = DataType::from_tag(index, tag)?;
        let len = usize::try_from(declared)
            .ok()
            .filter(|len| *len <= rest.len())
            .ok_or(CodecError::ArgumentOverrun {
                index,
                declared,
                remaining: rest.len(),
            })?;
        let (raw, tail) = rest.split_at(len);
        arguments.push((data_type, raw));
        rest = tail;
    }

    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes {
            trailing: rest.len(),
        });
    }
    Ok(arguments)
}

fn normalize(
    index: usize,
    data_type: DataType,
    raw: &[u8],
    validator: &dyn SecureCompute,
) -> Result<Normalized, CodecError> {
    let encoded = match data_type.encrypted_kind() {
        Some(kind) => {
            let handle = abi::decode_wire(kind, raw).map_err(|e| CodecError::Decode {
                index,
                data_type,
                reason: e.to_string(),
            })?;
            let limbs = validator
                .validate(&handle)
                .map_err(|source| CodecError::Validation { index, source })?;
            abi::encode_ground_truth(kind, &limbs)
                .map_err(|source| CodecError::Validation { index, source })?
        }
        None => raw.to_vec(),
    };

    match data_type.static_words() {
        Some(words) => {
            let expected = words * WORD;
            if encoded.len() != expected {
                return Err(CodecError::StaticLengthMismatch {
                    index,
                    expected,
                    found: encoded.len(),
                });
            }
            Ok(Normalized::Static(encoded))
        }
        None => {
            if encoded.len() < WORD {
                return Err(CodecError::DynamicTooShort {
                    index,
                    found: encoded.len(),
                });
            }
            Ok(Normalized::Dynamic(encoded[WORD..].to_vec()))
        }
    }
}

fn assemble(selector: &[u8], arguments: &[Normalized]) -> Vec<u8> {
    let head_size: usize = arguments
        .iter()
        .map(|argument| match argument {
            Normalized::Static(words) => words.len(),
            Normalized::Dynamic(_) => WORD,
        })
        .sum();
    let tail_size: usize = arguments
        .iter()
        .map(|argument| match argument {
            Normalized::Static(_) => 0,
            Normalized::Dynamic(payload) => payload.len(),
        })
        .sum();

    let mut out = Vec::with_capacity(selector.len() + head_size + tail_size);
    out.extend_from_slice(selector);

    let mut tail_offset = 0usize;
    for argument in arguments {
        match argument {
            Normalized::Static(words) => out.extend_from_slice(words),
            Normalized::Dynamic(payload) => {
                out.extend_from_slice(&abi::word(head_size + tail_offset));
                tail_offset += payload.len();
            }
        }
    }
    for argument in arguments {
        if let Normalized::Dynamic(payload) = argument {
            out.extend_from_slice(payload);
        }
    }
    out
}
