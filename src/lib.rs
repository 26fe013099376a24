//! Inbox GMP Library
//!
//! Cross-chain message passing between Inbox chains: a request ledger with
//! two-way and one-way requests, miner-gated batch delivery with a
//! nonce-contiguity guard, an argument codec that upgrades user-encrypted
//! handles through a secure-compute validator, and the off-chain relay that
//! links two chains.
pub mod chain;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod host;
pub mod inbox;
pub mod ledger;
pub mod miner_gate;
pub mod relay;
pub mod secure_compute;
pub mod types;

// Re-export commonly used types
pub use chain::LocalChain;
pub use codec::{reencode, DataType, MethodCallBuilder};
pub use crate::config::Config;
pub use crypto::CryptoService;
pub use error::{CodecError, InboxError, SecureComputeError};
pub use host::{CallEnv, Contract, ContractInvoker, ContractRegistry};
pub use inbox::Inbox;
pub use miner_gate::{Authorizer, GateConfig, MinerGate, RelayRegistry};
pub use relay::{EvmInboxClient, InboxClient, InboxRelay, InboxRelayConfig, LocalInboxClient};
pub use secure_compute::{LocalSecureCompute, SecureCompute};
pub use types::{
    ChainId, ErrorRecord, ExecutionContext, InboxEvent, MethodCall, MinedError, MinedRequest,
    Request, RequestId, ResponseRecord, Selector, DELIVERY_FAILED,
};
