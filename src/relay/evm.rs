//! JSON-RPC client for an Inbox deployed on an EVM chain.
//!
//! Views go through `eth_call`. Batches are submitted as locally signed
//! legacy EIP-155 transactions and confirmed by polling for the receipt.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use alloy_rlp::RlpEncodable;
use alloy_sol_types::SolCall;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use sha3::{Digest, Keccak256};
use tracing::{debug, info};

use super::client::InboxClient;
use crate::config::{InboxChainConfig, RelayerConfig};
use crate::crypto::CryptoService;
use crate::types::{ChainId, ErrorRecord, MinedError, MinedRequest, Request, RequestId};

const RPC_TIMEOUT: Duration = Duration::from_secs(15);
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const GAS_LIMIT: u64 = 5_000_000;

/// Solidity ABI of the Inbox contract.
pub mod bindings {
    use alloy_sol_types::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct MethodCall {
            bytes4 selector;
            bytes data;
            uint8[] datatypes;
            uint256[] datalens;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Request {
            bytes32 requestId;
            uint256 targetChainId;
            address targetContract;
            MethodCall methodCall;
            address callerContract;
            address originalSender;
            uint64 timestamp;
            bytes4 callbackSelector;
            bytes4 errorSelector;
            bool isTwoWay;
            bool executed;
            bytes32 sourceRequestId;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct MinedRequest {
            bytes32 requestId;
            address sourceContract;
            address targetContract;
            MethodCall methodCall;
            bytes4 callbackSelector;
            bytes4 errorSelector;
            bool isTwoWay;
            bytes32 sourceRequestId;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct ErrorEntry {
            bytes32 requestId;
            uint256 errorCode;
            bytes errorMessage;
        }

        interface IInbox {
            function getRequestsLen() external view returns (uint256);
            function getRequests(uint256 from, uint256 len) external view returns (Request[] memory);
            function getErrorsLen() external view returns (uint256);
            function getErrors(uint256 from, uint256 len) external view returns (ErrorEntry[] memory);
            function lastIncomingRequestId(uint256 sourceChainId) external view returns (bytes32);
            function batchProcessRequests(
                uint256 sourceChainId,
                MinedRequest[] calldata minedRequests,
                ErrorEntry[] calldata minedErrors
            ) external;
        }
    }
}

/// EIP-155 `v = recovery_id + chain_id * 2 + 35`.
fn eip155_v(recovery_id: u8, chain_id: ChainId) -> Result<u64> {
    chain_id
        .checked_mul(2)
        .and_then(|v| v.checked_add(35 + u64::from(recovery_id)))
        .ok_or_else(|| anyhow::anyhow!("Chain id {} too large for an EIP-155 signature", chain_id))
}

fn to_u64(value: U256, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow::anyhow!("{} {} does not fit in u64", field, value))
}

impl TryFrom<bindings::MethodCall> for crate::types::MethodCall {
    type Error = anyhow::Error;

    fn try_from(call: bindings::MethodCall) -> Result<Self> {
        let datalens = call
            .datalens
            .into_iter()
            .map(|len| to_u64(len, "datalen"))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            selector: call.selector,
            data: call.data,
            datatypes: call.datatypes,
            datalens,
        })
    }
}

impl From<&crate::types::MethodCall> for bindings::MethodCall {
    fn from(call: &crate::types::MethodCall) -> Self {
        Self {
            selector: call.selector,
            data: call.data.clone(),
            datatypes: call.datatypes.clone(),
            datalens: call.datalens.iter().map(|len| U256::from(*len)).collect(),
        }
    }
}

impl TryFrom<bindings::Request> for Request {
    type Error = anyhow::Error;

    fn try_from(request: bindings::Request) -> Result<Self> {
        Ok(Self {
            request_id: RequestId(request.requestId),
            target_chain_id: to_u64(request.targetChainId, "targetChainId")?,
            target_contract: request.targetContract,
            method_call: request.methodCall.try_into()?,
            caller_contract: request.callerContract,
            original_sender: request.originalSender,
            timestamp: request.timestamp,
            callback_selector: request.callbackSelector,
            error_selector: request.errorSelector,
            is_two_way: request.isTwoWay,
            executed: request.executed,
            source_request_id: RequestId(request.sourceRequestId),
        })
    }
}

impl From<&MinedRequest> for bindings::MinedRequest {
    fn from(request: &MinedRequest) -> Self {
        Self {
            requestId: request.request_id.0,
            sourceContract: request.source_contract,
            targetContract: request.target_contract,
            methodCall: (&request.method_call).into(),
            callbackSelector: request.callback_selector,
            errorSelector: request.error_selector,
            isTwoWay: request.is_two_way,
            sourceRequestId: request.source_request_id.0,
        }
    }
}

impl From<&MinedError> for bindings::ErrorEntry {
    fn from(error: &MinedError) -> Self {
        Self {
            requestId: error.request_id.0,
            errorCode: U256::from(error.error_code),
            errorMessage: error.error_message.clone(),
        }
    }
}

impl TryFrom<bindings::ErrorEntry> for ErrorRecord {
    type Error = anyhow::Error;

    fn try_from(error: bindings::ErrorEntry) -> Result<Self> {
        Ok(Self {
            request_id: RequestId(error.requestId),
            error_code: to_u64(error.errorCode, "errorCode")?,
            error_message: error.errorMessage,
        })
    }
}

/// `[nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]`
#[derive(RlpEncodable)]
struct UnsignedLegacyTx {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    input: Bytes,
    chain_id: u64,
    zero_r: u8,
    zero_s: u8,
}

/// `[nonce, gasPrice, gasLimit, to, value, data, v, r, s]`
#[derive(RlpEncodable)]
struct SignedLegacyTx {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    input: Bytes,
    v: u64,
    r: U256,
    s: U256,
}

pub struct EvmInboxClient {
    http_client: Client,
    rpc_url: String,
    chain_id: ChainId,
    inbox: Address,
    crypto_service: CryptoService,
    receipt_timeout: Duration,
}

impl EvmInboxClient {
    pub fn new(
        chain: &InboxChainConfig,
        relayer: &RelayerConfig,
        crypto_service: CryptoService,
    ) -> Result<Self> {
        Ok(Self {
            http_client: Client::new(),
            rpc_url: chain.rpc_url.clone(),
            chain_id: chain.chain_id,
            inbox: chain.inbox_address()?,
            crypto_service,
            receipt_timeout: Duration::from_millis(relayer.receipt_timeout_ms),
        })
    }

    /// Address transactions are sent from.
    pub fn relayer_address(&self) -> Address {
        self.crypto_service.evm_address()
    }

    async fn json_rpc<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let rpc_future = async {
            let resp = self
                .http_client
                .post(&self.rpc_url)
                .json(&request)
                .send()
                .await
                .with_context(|| format!("Failed to send {} request to {}", method, self.rpc_url))?;
            resp.json::<serde_json::Value>()
                .await
                .with_context(|| format!("Failed to parse {} response from {}", method, self.rpc_url))
        };

        let response: serde_json::Value = tokio::time::timeout(RPC_TIMEOUT, rpc_future)
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "Timed out after {}s waiting for {} from {}",
                    RPC_TIMEOUT.as_secs(),
                    method,
                    self.rpc_url
                )
            })??;

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            anyhow::bail!(
                "JSON-RPC error from {} ({}): {} (code: {})",
                self.rpc_url,
                method,
                message,
                code
            );
        }

        let result = response
            .get("result")
            .ok_or_else(|| anyhow::anyhow!("No result in {} response", method))?;

        serde_json::from_value(result.clone())
            .with_context(|| format!("Failed to deserialize {} result", method))
    }

    /// Executes a view call against the Inbox and decodes its return value.
    async fn view<C: SolCall>(&self, call: C) -> Result<C::Return> {
        let data = format!("0x{}", hex::encode(call.abi_encode()));
        let result: String = self
            .json_rpc(
                "eth_call",
                vec![
                    serde_json::json!({ "to": self.inbox.to_string(), "data": data }),
                    serde_json::json!("latest"),
                ],
            )
            .await?;
        let bytes = hex::decode(result.strip_prefix("0x").unwrap_or(&result))
            .context("eth_call returned invalid hex")?;
        C::abi_decode_returns(&bytes)
            .map_err(|e| anyhow::anyhow!("Failed to decode {} return data: {}", C::SIGNATURE, e))
    }

    async fn quantity(&self, method: &str, params: Vec<serde_json::Value>) -> Result<u128> {
        let value: String = self.json_rpc(method, params).await?;
        u128::from_str_radix(value.strip_prefix("0x").unwrap_or(&value), 16)
            .with_context(|| format!("Failed to parse {} result '{}'", method, value))
    }

    /// Signs and submits a transaction to the Inbox, returning its hash.
    async fn send_transaction(&self, calldata: Vec<u8>) -> Result<String> {
        let from = self.relayer_address();

        let nonce = self
            .quantity(
                "eth_getTransactionCount",
                vec![serde_json::json!(from.to_string()), serde_json::json!("pending")],
            )
            .await
            .context("eth_getTransactionCount failed")?;
        let nonce = u64::try_from(nonce).context("Account nonce does not fit in u64")?;
        let gas_price = self
            .quantity("eth_gasPrice", vec![])
            .await
            .context("eth_gasPrice failed")?;
        let input = Bytes::from(calldata);

        let unsigned = UnsignedLegacyTx {
            nonce,
            gas_price,
            gas_limit: GAS_LIMIT,
            to: self.inbox,
            value: U256::ZERO,
            input: input.clone(),
            chain_id: self.chain_id,
            zero_r: 0,
            zero_s: 0,
        };
        let tx_hash: [u8; 32] = Keccak256::digest(alloy_rlp::encode(&unsigned)).into();

        let (r, s, recovery_id) = self
            .crypto_service
            .sign_evm_transaction_hash(&tx_hash)
            .context("Failed to sign EVM transaction")?;

        let v = eip155_v(recovery_id, self.chain_id)?;
        let signed = SignedLegacyTx {
            nonce,
            gas_price,
            gas_limit: GAS_LIMIT,
            to: self.inbox,
            value: U256::ZERO,
            input,
            v,
            r: U256::from_be_bytes(r),
            s: U256::from_be_bytes(s),
        };
        let raw_tx = format!("0x{}", hex::encode(alloy_rlp::encode(&signed)));

        debug!(
            "EVM raw tx: nonce={}, gas_price={}, chain_id={}, from={}",
            nonce, gas_price, self.chain_id, from
        );

        self.json_rpc("eth_sendRawTransaction", vec![serde_json::json!(raw_tx)])
            .await
            .context("eth_sendRawTransaction failed")
    }

    /// Waits for the receipt and requires status `0x1`.
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<()> {
        let attempts = (self.receipt_timeout.as_millis() / RECEIPT_POLL_INTERVAL.as_millis()).max(1);
        for _ in 0..attempts {
            let receipt: Option<serde_json::Value> = self
                .json_rpc("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
                .await?;

            if let Some(receipt) = receipt {
                let status = receipt
                    .get("status")
                    .and_then(|s| s.as_str())
                    .unwrap_or("0x0");
                if status == "0x1" {
                    return Ok(());
                }
                anyhow::bail!("EVM transaction {} failed with status: {}", tx_hash, status);
            }

            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }

        anyhow::bail!("Timed out waiting for EVM transaction receipt: {}", tx_hash)
    }
}

#[async_trait]
impl InboxClient for EvmInboxClient {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn requests_len(&self) -> Result<u64> {
        let len = self.view(bindings::IInbox::getRequestsLenCall {}).await?;
        to_u64(len, "getRequestsLen")
    }

    async fn requests(&self, from: u64, len: u64) -> Result<Vec<Request>> {
        let requests = self
            .view(bindings::IInbox::getRequestsCall {
                from: U256::from(from),
                len: U256::from(len),
            })
            .await?;
        requests.into_iter().map(Request::try_from).collect()
    }

    async fn errors_len(&self) -> Result<u64> {
        let len = self.view(bindings::IInbox::getErrorsLenCall {}).await?;
        to_u64(len, "getErrorsLen")
    }

    async fn errors(&self, from: u64, len: u64) -> Result<Vec<ErrorRecord>> {
        let errors = self
            .view(bindings::IInbox::getErrorsCall {
                from: U256::from(from),
                len: U256::from(len),
            })
            .await?;
        errors.into_iter().map(ErrorRecord::try_from).collect()
    }

    async fn last_incoming_request_id(&self, source_chain_id: ChainId) -> Result<RequestId> {
        let id = self
            .view(bindings::IInbox::lastIncomingRequestIdCall {
                sourceChainId: U256::from(source_chain_id),
            })
            .await?;
        Ok(RequestId(id))
    }

    async fn batch_process_requests(
        &self,
        source_chain_id: ChainId,
        requests: Vec<MinedRequest>,
        errors: Vec<MinedError>,
    ) -> Result<()> {
        let call = bindings::IInbox::batchProcessRequestsCall {
            sourceChainId: U256::from(source_chain_id),
            minedRequests: requests.iter().map(Into::into).collect(),
            minedErrors: errors.iter().map(Into::into).collect(),
        };
        let tx_hash = self.send_transaction(call.abi_encode()).await?;
        info!(
            "Submitted batch to chain {}: {} requests, {} errors, tx={}",
            self.chain_id,
            requests.len(),
            errors.len(),
            tx_hash
        );
        self.wait_for_receipt(&tx_hash).await
    }
}
