//! Chain access used by the relayer.

use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::chain::LocalChain;
use crate::types::{ChainId, ErrorRecord, MinedError, MinedRequest, Request, RequestId};

/// What the relayer needs from one Inbox chain.
#[async_trait]
pub trait InboxClient: Send + Sync {
    fn chain_id(&self) -> ChainId;

    async fn requests_len(&self) -> Result<u64>;

    /// Outgoing requests by zero-based index; index `i` has nonce `i + 1`.
    async fn requests(&self, from: u64, len: u64) -> Result<Vec<Request>>;

    async fn errors_len(&self) -> Result<u64>;

    async fn errors(&self, from: u64, len: u64) -> Result<Vec<ErrorRecord>>;

    async fn last_incoming_request_id(&self, source_chain_id: ChainId) -> Result<RequestId>;

    async fn batch_process_requests(
        &self,
        source_chain_id: ChainId,
        requests: Vec<MinedRequest>,
        errors: Vec<MinedError>,
    ) -> Result<()>;
}

/// Client for an in-process chain, submitting as `relayer`.
pub struct LocalInboxClient {
    chain: Arc<Mutex<LocalChain>>,
    chain_id: ChainId,
    relayer: Address,
}

impl LocalInboxClient {
    pub async fn new(chain: Arc<Mutex<LocalChain>>, relayer: Address) -> Self {
        let chain_id = chain.lock().await.chain_id();
        Self {
            chain,
            chain_id,
            relayer,
        }
    }
}

#[async_trait]
impl InboxClient for LocalInboxClient {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn requests_len(&self) -> Result<u64> {
        Ok(self.chain.lock().await.inbox().get_requests_len())
    }

    async fn requests(&self, from: u64, len: u64) -> Result<Vec<Request>> {
        Ok(self.chain.lock().await.inbox().get_requests(from, len))
    }

    async fn errors_len(&self) -> Result<u64> {
        Ok(self.chain.lock().await.inbox().get_errors_len())
    }

    async fn errors(&self, from: u64, len: u64) -> Result<Vec<ErrorRecord>> {
        Ok(self.chain.lock().await.inbox().get_errors(from, len))
    }

    async fn last_incoming_request_id(&self, source_chain_id: ChainId) -> Result<RequestId> {
        Ok(self
            .chain
            .lock()
            .await
            .last_incoming_request_id(source_chain_id))
    }

    async fn batch_process_requests(
        &self,
        source_chain_id: ChainId,
        requests: Vec<MinedRequest>,
        errors: Vec<MinedError>,
    ) -> Result<()> {
        self.chain.lock().await.batch_process_requests(
            self.relayer,
            source_chain_id,
            &requests,
            &errors,
        )?;
        Ok(())
    }
}
