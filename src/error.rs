//! Error definitions for the Inbox core, the argument codec and the
//! secure-compute collaborator.

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::codec::DataType;
use crate::types::{ChainId, RequestId};

/// Structural violations and not-found conditions raised by the Inbox.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InboxError {
    #[error("Target chain {0} is this chain: same-chain requests are not allowed")]
    SameChainTarget(ChainId),

    #[error("Target contract is the zero address")]
    ZeroTargetAddress,

    #[error("Request id component out of range: chain_id={chain_id}, nonce={nonce}")]
    IdComponentOverflow { chain_id: U256, nonce: U256 },

    #[error("No execution context is active")]
    NoActiveContext,

    #[error("Incoming request not found: {0}")]
    IncomingRequestNotFound(RequestId),

    #[error("Original sender of request {0} cannot be resolved")]
    OriginalSenderUnresolved(RequestId),

    #[error("Request {0} carries no callback selector to respond to")]
    CallbackNotSet(RequestId),

    #[error("No error recorded for request {0}")]
    ErrorNotFound(RequestId),

    #[error("No response recorded for request {0}")]
    ResponseNotFound(RequestId),

    #[error("Unauthorized: {0} is not an authorized relayer")]
    UnauthorizedRelayer(Address),

    #[error("Unauthorized: {0} is not the registry owner")]
    UnauthorizedOwner(Address),

    #[error("Invalid source chain {0}: a batch cannot originate from this chain")]
    InvalidSourceChain(ChainId),

    #[error("Request {request_id} does not originate from source chain {source_chain_id}")]
    ForeignRequestId {
        source_chain_id: ChainId,
        request_id: RequestId,
    },

    #[error("Nonce gap from source chain {source_chain_id}: expected {expected}, got {found}")]
    NonceNotContiguous {
        source_chain_id: ChainId,
        expected: U256,
        found: U256,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Fatal conditions of the argument codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Argument table mismatch: {types} type tags but {lens} lengths")]
    TableLengthMismatch { types: usize, lens: usize },

    #[error("Argument {index} declares {declared} bytes but only {remaining} remain")]
    ArgumentOverrun {
        index: usize,
        declared: u64,
        remaining: usize,
    },

    #[error("{trailing} trailing bytes left after the last argument")]
    TrailingBytes { trailing: usize },

    #[error("Static argument {index} encodes to {found} bytes, expected {expected}")]
    StaticLengthMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Dynamic argument {index} encodes to {found} bytes, shorter than one word")]
    DynamicTooShort { index: usize, found: usize },

    #[error("Unrecognized argument type tag {tag} at index {index}")]
    UnknownDataType { index: usize, tag: u8 },

    #[error("Raw passthrough call carries {0} typed arguments")]
    RawCallWithArguments(usize),

    #[error("Argument {index} ({data_type:?}) could not be decoded: {reason}")]
    Decode {
        index: usize,
        data_type: DataType,
        reason: String,
    },

    #[error("Builder expected {expected} arguments, got {found}")]
    ArgumentCount { expected: usize, found: usize },

    #[error("Validation of argument {index} failed: {source}")]
    Validation {
        index: usize,
        #[source]
        source: SecureComputeError,
    },
}

/// Rejections reported by the secure-compute validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecureComputeError {
    #[error("Signature count {signatures} does not match ciphertext limb count {limbs}")]
    SignatureCount { limbs: usize, signatures: usize },

    #[error("Invalid signature for ciphertext limb {0}")]
    InvalidSignature(usize),

    #[error("Malformed handle: {0}")]
    MalformedHandle(String),
}
