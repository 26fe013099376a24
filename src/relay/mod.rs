//! Inbox Relay Module
//!
//! Links two Inbox chains. For each direction the relay:
//! 1. Reads the destination's last accepted request id for the source chain
//! 2. Fetches the next source requests addressed to the destination
//! 3. Forwards new destination error records about source requests
//! 4. Submits both through `batchProcessRequests`
//!
//! The destination's marker is the only request cursor, so a restarted relay
//! resumes exactly where the destination left off and never skips a nonce.
//!
//! ## Security
//!
//! **CRITICAL**: The relay holds a key authorized to deliver arbitrary batches.
//! Ensure proper key management and access controls for production use.

pub mod client;
pub mod evm;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::types::{ChainId, MinedError, MinedRequest};

pub use client::{InboxClient, LocalInboxClient};
pub use evm::EvmInboxClient;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct InboxRelayConfig {
    /// Polling interval in milliseconds
    pub polling_interval_ms: u64,
    /// Maximum requests per batch
    pub batch_size: u64,
}

impl InboxRelayConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            polling_interval_ms: config.relayer.polling_interval_ms,
            batch_size: config.relayer.batch_size,
        }
    }
}

// ============================================================================
// RELAY STATE
// ============================================================================

/// Cursors the relay keeps in memory.
#[derive(Debug, Default)]
struct RelayState {
    /// Per chain, number of its error records already examined.
    error_cursors: HashMap<ChainId, u64>,
}

/// Outcome of one poll in one direction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LaneReport {
    pub requests: usize,
    pub errors: usize,
}

// ============================================================================
// RELAY
// ============================================================================

pub struct InboxRelay {
    config: InboxRelayConfig,
    chain_a: Arc<dyn InboxClient>,
    chain_b: Arc<dyn InboxClient>,
    state: RwLock<RelayState>,
}

impl InboxRelay {
    pub fn new(
        config: InboxRelayConfig,
        chain_a: Arc<dyn InboxClient>,
        chain_b: Arc<dyn InboxClient>,
    ) -> Self {
        Self {
            config,
            chain_a,
            chain_b,
            state: RwLock::new(RelayState::default()),
        }
    }

    /// Start the relay service (blocking).
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting inbox relay: chain_a={}, chain_b={}, polling_interval={}ms, batch_size={}",
            self.chain_a.chain_id(),
            self.chain_b.chain_id(),
            self.config.polling_interval_ms,
            self.config.batch_size
        );

        let interval = Duration::from_millis(self.config.polling_interval_ms);

        loop {
            if let Err(e) = self.relay_lane(&self.chain_a, &self.chain_b).await {
                error!(
                    "Error relaying chain {} -> chain {}: {:#}",
                    self.chain_a.chain_id(),
                    self.chain_b.chain_id(),
                    e
                );
            }
            if let Err(e) = self.relay_lane(&self.chain_b, &self.chain_a).await {
                error!(
                    "Error relaying chain {} -> chain {}: {:#}",
                    self.chain_b.chain_id(),
                    self.chain_a.chain_id(),
                    e
                );
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// Runs one poll in both directions; returns the A->B and B->A reports.
    pub async fn poll_once(&self) -> Result<(LaneReport, LaneReport)> {
        let forward = self.relay_lane(&self.chain_a, &self.chain_b).await?;
        let backward = self.relay_lane(&self.chain_b, &self.chain_a).await?;
        Ok((forward, backward))
    }

    /// Delivers pending `source` requests to `destination` and hands
    /// `destination` errors about them back to `source`.
    async fn relay_lane(
        &self,
        source: &Arc<dyn InboxClient>,
        destination: &Arc<dyn InboxClient>,
    ) -> Result<LaneReport> {
        let requests = self.relay_requests(source, destination).await?;
        let errors = self.relay_errors(source, destination).await?;
        Ok(LaneReport { requests, errors })
    }

    async fn relay_requests(
        &self,
        source: &Arc<dyn InboxClient>,
        destination: &Arc<dyn InboxClient>,
    ) -> Result<usize> {
        let source_chain_id = source.chain_id();
        let destination_chain_id = destination.chain_id();

        let marker = destination
            .last_incoming_request_id(source_chain_id)
            .await
            .context("Failed to read last incoming request id")?;
        let next_index = marker
            .nonce()
            .ok_or_else(|| anyhow::anyhow!("Marker {} has an out-of-range nonce", marker))?;
        let total = source.requests_len().await?;
        if next_index >= total {
            return Ok(0);
        }

        let len = (total - next_index).min(self.config.batch_size);
        let pending = source.requests(next_index, len).await?;

        // Contiguity means a request for another chain blocks this lane.
        let mined: Vec<MinedRequest> = pending
            .iter()
            .take_while(|request| request.target_chain_id == destination_chain_id)
            .map(MinedRequest::from)
            .collect();
        if mined.len() < pending.len() {
            warn!(
                "Request {} on chain {} targets chain {}, lane to chain {} stalls there",
                pending[mined.len()].request_id,
                source_chain_id,
                pending[mined.len()].target_chain_id,
                destination_chain_id
            );
        }
        if mined.is_empty() {
            return Ok(0);
        }

        let count = mined.len();
        destination
            .batch_process_requests(source_chain_id, mined, Vec::new())
            .await
            .with_context(|| {
                format!(
                    "Failed to deliver {} requests from chain {} to chain {}",
                    count, source_chain_id, destination_chain_id
                )
            })?;
        info!(
            "Delivered {} requests from chain {} to chain {} (from nonce {})",
            count,
            source_chain_id,
            destination_chain_id,
            next_index + 1
        );
        Ok(count)
    }

    async fn relay_errors(
        &self,
        source: &Arc<dyn InboxClient>,
        destination: &Arc<dyn InboxClient>,
    ) -> Result<usize> {
        let source_chain_id = source.chain_id();
        let destination_chain_id = destination.chain_id();

        let cursor = self
            .state
            .read()
            .await
            .error_cursors
            .get(&destination_chain_id)
            .copied()
            .unwrap_or(0);
        let total = destination.errors_len().await?;
        if cursor >= total {
            return Ok(0);
        }

        let len = (total - cursor).min(self.config.batch_size);
        let records = destination.errors(cursor, len).await?;
        let examined = records.len() as u64;
        let mined: Vec<MinedError> = records
            .iter()
            .filter(|record| record.request_id.chain_id() == Some(source_chain_id))
            .map(MinedError::from)
            .collect();

        let count = mined.len();
        if count > 0 {
            source
                .batch_process_requests(destination_chain_id, Vec::new(), mined)
                .await
                .with_context(|| {
                    format!(
                        "Failed to return {} errors from chain {} to chain {}",
                        count, destination_chain_id, source_chain_id
                    )
                })?;
            info!(
                "Returned {} errors from chain {} to chain {}",
                count, destination_chain_id, source_chain_id
            );
        } else {
            debug!(
                "No errors about chain {} among {} records on chain {}",
                source_chain_id, examined, destination_chain_id
            );
        }

        self.state
            .write()
            .await
            .error_cursors
            .insert(destination_chain_id, cursor + examined);
        Ok(count)
    }
}
