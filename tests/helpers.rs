//! Shared test helpers
//!
//! The module is organized into several categories:
//! - **Constants**: Chain ids, addresses and keys used across tests
//! - **Demo Contracts**: Small hosted contracts exercising the inbox from the inside
//! - **Chain Builders**: Functions to create authorized local chains and relay batches
//! - **Configuration Builders**: Functions to create test configurations

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use inbox_gmp::codec::abi::{ItString, ItUint128, ItUint256, ItUint64, CtString, CtUint128, CtUint256};
use inbox_gmp::codec::EncryptedKind;
use inbox_gmp::config::{Config, InboxChainConfig, RelayerConfig};
use inbox_gmp::host::{revert_with, CallEnv, Contract};
use inbox_gmp::{
    ChainId, LocalChain, LocalSecureCompute, MinedError, MinedRequest, RequestId, Selector,
};

// ============================================================================
// CONSTANTS
// ============================================================================

// -------------------------------- CHAINS --------------------------------

pub const CHAIN_A: ChainId = 31337;
pub const CHAIN_B: ChainId = 31338;

// -------------------------------- USERS ---------------------------------

/// Owner of both relay registries
pub const OWNER: Address = address!("00000000000000000000000000000000000000a1");

/// Allow-listed relayer
pub const RELAYER: Address = address!("00000000000000000000000000000000000000a2");

/// Address never authorized anywhere
pub const STRANGER: Address = address!("00000000000000000000000000000000000000a3");

// ------------------------------ CONTRACTS -------------------------------

/// Application contract on chain A that sends requests and receives callbacks
pub const SOURCE_APP: Address = address!("0000000000000000000000000000000000000a01");

/// Adder deployed on chain B
pub const ADDER: Address = address!("0000000000000000000000000000000000000b01");

/// Always-reverting contract on chain B
pub const REVERTER: Address = address!("0000000000000000000000000000000000000b02");

/// Calldata recorder on chain B
pub const PROBE: Address = address!("0000000000000000000000000000000000000b03");

/// Contract on chain B that sends a message and then reverts
pub const SEND_THEN_REVERT: Address = address!("0000000000000000000000000000000000000b04");

/// Address with no contract
pub const EMPTY_ADDR: Address = address!("0000000000000000000000000000000000000bff");

// -------------------------------- OTHER ---------------------------------

/// Network key of the local secure-compute backend
pub const NETWORK_KEY: B256 = B256::repeat_byte(0x5e);

/// Dummy owner argument of `add`
pub const DUMMY_OWNER_ARG: Address = address!("0000000000000000000000000000000000000abc");

/// Dummy relayer private key (base64 of 32 bytes 0x01)
pub const DUMMY_PRIVATE_KEY_B64: &str = "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=";

// ============================================================================
// ABI
// ============================================================================

sol! {
    function add(uint256 a, uint256 b, address owner);
    function onAddResult(bytes response);
    function onError(bytes32 requestId, uint64 errorCode, bytes errorMessage);
    function ping(uint256 value);
}

// ============================================================================
// DEMO CONTRACTS
// ============================================================================

/// What the source application observed.
#[derive(Debug, Default)]
pub struct AppLog {
    /// Raw `response` argument of each `onAddResult` call
    pub results: Vec<Bytes>,
    /// Decoded `onError` calls
    pub errors: Vec<(B256, u64, Bytes)>,
    /// `inboxMsgSender()` seen inside each callback
    pub senders: Vec<(ChainId, Address)>,
}

/// Receives `onAddResult` and `onError` callbacks.
pub struct SourceApp {
    pub log: Arc<Mutex<AppLog>>,
    pub fail_error_handler: bool,
}

impl Contract for SourceApp {
    fn call(&mut self, env: &mut CallEnv<'_>, calldata: &[u8]) -> Result<Bytes, Bytes> {
        let sender = env.msg_sender().map_err(|e| revert_with(&e.to_string()))?;
        let mut log = self.log.lock().unwrap();
        if let Ok(call) = onAddResultCall::abi_decode(calldata) {
            log.results.push(call.response);
            log.senders.push(sender);
            return Ok(Bytes::new());
        }
        if let Ok(call) = onErrorCall::abi_decode(calldata) {
            log.senders.push(sender);
            if self.fail_error_handler {
                return Err(revert_with("error handler failed"));
            }
            log.errors
                .push((call.requestId, call.errorCode, call.errorMessage));
            return Ok(Bytes::new());
        }
        Err(revert_with("unknown selector"))
    }
}

/// Computes `a + b` and responds with the ABI-encoded sum.
pub struct Adder {
    pub senders: Arc<Mutex<Vec<(ChainId, Address)>>>,
}

impl Contract for Adder {
    fn call(&mut self, env: &mut CallEnv<'_>, calldata: &[u8]) -> Result<Bytes, Bytes> {
        let call = addCall::abi_decode(calldata).map_err(|e| revert_with(&e.to_string()))?;
        let sender = env.msg_sender().map_err(|e| revert_with(&e.to_string()))?;
        self.senders.lock().unwrap().push(sender);
        let sum = call.a + call.b;
        env.respond(sum.abi_encode().into())
            .map_err(|e| revert_with(&e.to_string()))?;
        Ok(Bytes::new())
    }
}

pub struct Reverter;

impl Contract for Reverter {
    fn call(&mut self, _env: &mut CallEnv<'_>, _calldata: &[u8]) -> Result<Bytes, Bytes> {
        Err(revert_with("boom"))
    }
}

/// Records every calldata it receives together with the active sender.
pub struct Probe {
    pub calls: Arc<Mutex<Vec<(Bytes, (ChainId, Address))>>>,
}

impl Contract for Probe {
    fn call(&mut self, env: &mut CallEnv<'_>, calldata: &[u8]) -> Result<Bytes, Bytes> {
        let sender = env.msg_sender().map_err(|e| revert_with(&e.to_string()))?;
        self.calls
            .lock()
            .unwrap()
            .push((Bytes::copy_from_slice(calldata), sender));
        Ok(Bytes::new())
    }
}

/// Sends a one-way message back to chain A, then reverts.
pub struct SendThenRevert;

impl Contract for SendThenRevert {
    fn call(&mut self, env: &mut CallEnv<'_>, _calldata: &[u8]) -> Result<Bytes, Bytes> {
        let (remote_chain, remote_contract) =
            env.msg_sender().map_err(|e| revert_with(&e.to_string()))?;
        env.send_one_way_message(
            remote_chain,
            remote_contract,
            inbox_gmp::MethodCall::raw(pingCall { value: U256::from(1u64) }.abi_encode()),
            Selector::ZERO,
        )
        .map_err(|e| revert_with(&e.to_string()))?;
        Err(revert_with("changed my mind"))
    }
}

// ============================================================================
// CHAIN BUILDERS
// ============================================================================

pub fn secure_compute() -> Arc<LocalSecureCompute> {
    Arc::new(LocalSecureCompute::new(NETWORK_KEY))
}

/// Chain with `RELAYER` authorized and no contracts.
pub fn authorized_chain(chain_id: ChainId) -> LocalChain {
    let mut chain = LocalChain::new(chain_id, OWNER, secure_compute());
    chain.registry_mut().add_authorized(OWNER, RELAYER).unwrap();
    chain
}

/// Chain A with `SourceApp` deployed.
pub fn source_chain(log: Arc<Mutex<AppLog>>, fail_error_handler: bool) -> LocalChain {
    let mut chain = authorized_chain(CHAIN_A);
    chain.deploy(
        SOURCE_APP,
        Box::new(SourceApp {
            log,
            fail_error_handler,
        }),
    );
    chain
}

/// Chain B with `Adder`, `Reverter`, `Probe` and `SendThenRevert` deployed.
pub fn destination_chain(
    adder_senders: Arc<Mutex<Vec<(ChainId, Address)>>>,
    probe_calls: Arc<Mutex<Vec<(Bytes, (ChainId, Address))>>>,
) -> LocalChain {
    let mut chain = authorized_chain(CHAIN_B);
    chain.deploy(
        ADDER,
        Box::new(Adder {
            senders: adder_senders,
        }),
    );
    chain.deploy(REVERTER, Box::new(Reverter));
    chain.deploy(PROBE, Box::new(Probe { calls: probe_calls }));
    chain.deploy(SEND_THEN_REVERT, Box::new(SendThenRevert));
    chain
}

/// `add(a, b, DUMMY_OWNER_ARG)` as raw calldata.
pub fn add_calldata(a: u64, b: u64) -> Vec<u8> {
    addCall {
        a: U256::from(a),
        b: U256::from(b),
        owner: DUMMY_OWNER_ARG,
    }
    .abi_encode()
}

pub fn on_add_result_selector() -> Selector {
    onAddResultCall::SELECTOR.into()
}

pub fn on_error_selector() -> Selector {
    onErrorCall::SELECTOR.into()
}

/// Packages every outgoing request of `chain` from index `from` as relayers do.
pub fn mine_requests(chain: &LocalChain, from: u64) -> Vec<MinedRequest> {
    chain
        .inbox()
        .get_requests(from, u64::MAX)
        .iter()
        .map(MinedRequest::from)
        .collect()
}

/// Packages every error record of `chain` about requests owned by `owner_chain`.
pub fn mine_errors(chain: &LocalChain, owner_chain: ChainId) -> Vec<MinedError> {
    chain
        .inbox()
        .get_errors(0, u64::MAX)
        .iter()
        .filter(|record| record.request_id.chain_id() == Some(owner_chain))
        .map(MinedError::from)
        .collect()
}

pub fn request_id(chain_id: ChainId, nonce: u64) -> RequestId {
    RequestId::from_parts(chain_id, nonce)
}

// ============================================================================
// ENCRYPTED INPUT BUILDERS
// ============================================================================

/// Signed single-limb input accepted by the local backend.
pub fn it_uint64(ciphertext: u64) -> ItUint64 {
    let backend = LocalSecureCompute::new(NETWORK_KEY);
    let limb = U256::from(ciphertext);
    ItUint64 {
        ciphertext: limb,
        signature: backend.sign_limb(EncryptedKind::Uint64, limb),
    }
}

pub fn it_uint128(high: u64, low: u64) -> ItUint128 {
    let backend = LocalSecureCompute::new(NETWORK_KEY);
    let (high, low) = (U256::from(high), U256::from(low));
    ItUint128 {
        ciphertext: CtUint128 { high, low },
        signature: vec![
            backend.sign_limb(EncryptedKind::Uint128, high),
            backend.sign_limb(EncryptedKind::Uint128, low),
        ],
    }
}

pub fn it_uint256(limbs: [u64; 4]) -> ItUint256 {
    let backend = LocalSecureCompute::new(NETWORK_KEY);
    let limbs = limbs.map(U256::from);
    ItUint256 {
        ciphertext: CtUint256 {
            high: CtUint128 {
                high: limbs[0],
                low: limbs[1],
            },
            low: CtUint128 {
                high: limbs[2],
                low: limbs[3],
            },
        },
        signature: limbs
            .iter()
            .map(|limb| backend.sign_limb(EncryptedKind::Uint256, *limb))
            .collect(),
    }
}

pub fn it_string(limbs: &[u64]) -> ItString {
    let backend = LocalSecureCompute::new(NETWORK_KEY);
    let value: Vec<U256> = limbs.iter().map(|limb| U256::from(*limb)).collect();
    ItString {
        signature: value
            .iter()
            .map(|limb| backend.sign_limb(EncryptedKind::String, *limb))
            .collect(),
        ciphertext: CtString { value },
    }
}

/// Ground-truth limb the local backend produces for `value`.
pub fn gt(kind: EncryptedKind, value: u64) -> U256 {
    LocalSecureCompute::ground_truth(kind, U256::from(value))
}

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Valid configuration pointing at the given RPC endpoints.
pub fn build_test_config(rpc_a: &str, rpc_b: &str, private_key_env: &str) -> Config {
    Config {
        relayer: RelayerConfig {
            private_key_env: private_key_env.to_string(),
            polling_interval_ms: 10,
            batch_size: 16,
            receipt_timeout_ms: 2000,
        },
        chain_a: InboxChainConfig {
            name: "Chain A".to_string(),
            rpc_url: rpc_a.to_string(),
            chain_id: CHAIN_A,
            inbox_addr: "0x00000000000000000000000000000000000000c1".to_string(),
        },
        chain_b: InboxChainConfig {
            name: "Chain B".to_string(),
            rpc_url: rpc_b.to_string(),
            chain_id: CHAIN_B,
            inbox_addr: "0x00000000000000000000000000000000000000c2".to_string(),
        },
    }
}
