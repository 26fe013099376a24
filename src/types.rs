//! Core data model shared by the ledger, the inbox core and the relayer.

use std::fmt;

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::InboxError;

/// Numeric chain identifier.
pub type ChainId = u64;

/// 4-byte function selector.
pub type Selector = FixedBytes<4>;

/// Numeric error code carried by an error record.
pub type ErrorCode = u64;

/// Error code stored when invoking the target contract fails.
pub const DELIVERY_FAILED: ErrorCode = 1;

// ============================================================================
// REQUEST IDENTITY
// ============================================================================

/// Packed request identity: owning chain id in the high 128 bits, nonce in the low 128 bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct RequestId(pub B256);

impl RequestId {
    pub const ZERO: Self = Self(B256::ZERO);

    /// Packs a chain id and nonce, rejecting either component wider than 128 bits.
    pub fn pack(chain_id: U256, nonce: U256) -> Result<Self, InboxError> {
        if chain_id.bit_len() > 128 || nonce.bit_len() > 128 {
            return Err(InboxError::IdComponentOverflow { chain_id, nonce });
        }
        let packed: U256 = (chain_id << 128usize) | nonce;
        Ok(Self(B256::from(packed.to_be_bytes::<32>())))
    }

    /// Packs native-width components; these always fit.
    pub fn from_parts(chain_id: ChainId, nonce: u64) -> Self {
        let packed: U256 = (U256::from(chain_id) << 128usize) | U256::from(nonce);
        Self(B256::from(packed.to_be_bytes::<32>()))
    }

    /// Splits the id back into `(chain_id, nonce)`.
    pub fn unpack(&self) -> (U256, U256) {
        let packed = U256::from_be_bytes(self.0 .0);
        (packed >> 128usize, packed & U256::from(u128::MAX))
    }

    /// Owning chain id, if it fits a native chain id.
    pub fn chain_id(&self) -> Option<ChainId> {
        u64::try_from(self.unpack().0).ok()
    }

    /// Nonce, if it fits in 64 bits.
    pub fn nonce(&self) -> Option<u64> {
        u64::try_from(self.unpack().1).ok()
    }

    pub fn is_zero(&self) -> bool {
        self.0 == B256::ZERO
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for RequestId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

// ============================================================================
// PAYLOADS AND RECORDS
// ============================================================================

/// Tagged argument payload.
///
/// `data` is the concatenation of individually ABI-encoded arguments, `datatypes`
/// and `datalens` give the type tag and byte length of each. A zero selector marks
/// raw passthrough: `data` is complete calldata and both tables are empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodCall {
    pub selector: Selector,
    pub data: Bytes,
    pub datatypes: Vec<u8>,
    pub datalens: Vec<u64>,
}

impl MethodCall {
    /// Wraps already-formed calldata for raw passthrough delivery.
    pub fn raw(calldata: impl Into<Bytes>) -> Self {
        Self {
            selector: Selector::ZERO,
            data: calldata.into(),
            datatypes: Vec::new(),
            datalens: Vec::new(),
        }
    }

    pub fn is_raw(&self) -> bool {
        self.selector == Selector::ZERO
    }
}

/// A unit of cross-chain work, as stored on either side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: RequestId,
    pub target_chain_id: ChainId,
    pub target_contract: Address,
    pub method_call: MethodCall,
    /// Immediate caller on the source chain.
    pub caller_contract: Address,
    /// Contract that receives the callback; differs from `caller_contract` for responses.
    pub original_sender: Address,
    pub timestamp: u64,
    pub callback_selector: Selector,
    pub error_selector: Selector,
    pub is_two_way: bool,
    pub executed: bool,
    /// Non-zero iff this request is a one-way response to an earlier request.
    pub source_request_id: RequestId,
}

impl Request {
    pub fn is_response(&self) -> bool {
        !self.is_two_way && !self.source_request_id.is_zero()
    }
}

/// Who is being delivered right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub remote_chain_id: ChainId,
    pub remote_contract: Address,
    pub request_id: RequestId,
}

/// Response stored against the original request id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub response_request_id: RequestId,
    pub response: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub request_id: RequestId,
    pub error_code: ErrorCode,
    pub error_message: Bytes,
}

// ============================================================================
// RELAYER WIRE SHAPES
// ============================================================================

/// A source-chain request as proposed by a relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedRequest {
    pub request_id: RequestId,
    pub source_contract: Address,
    pub target_contract: Address,
    pub method_call: MethodCall,
    pub callback_selector: Selector,
    pub error_selector: Selector,
    pub is_two_way: bool,
    pub source_request_id: RequestId,
}

impl From<&Request> for MinedRequest {
    fn from(request: &Request) -> Self {
        Self {
            request_id: request.request_id,
            source_contract: request.caller_contract,
            target_contract: request.target_contract,
            method_call: request.method_call.clone(),
            callback_selector: request.callback_selector,
            error_selector: request.error_selector,
            is_two_way: request.is_two_way,
            source_request_id: request.source_request_id,
        }
    }
}

/// A destination-chain error record as proposed by a relayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedError {
    pub request_id: RequestId,
    pub error_code: ErrorCode,
    pub error_message: Bytes,
}

impl From<&ErrorRecord> for MinedError {
    fn from(record: &ErrorRecord) -> Self {
        Self {
            request_id: record.request_id,
            error_code: record.error_code,
            error_message: record.error_message.clone(),
        }
    }
}

/// Observable ledger transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxEvent {
    MessageSent(Request),
    ResponseReceived {
        request_id: RequestId,
        response_request_id: RequestId,
        response: Bytes,
    },
    ErrorReceived {
        request_id: RequestId,
        error_code: ErrorCode,
        error_message: Bytes,
    },
    RequestExecuted {
        request_id: RequestId,
        source_chain_id: ChainId,
    },
}
