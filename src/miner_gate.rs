//! Miner-gated delivery.
//!
//! Wraps the inbox core with relayer authorization and a per-source-chain
//! nonce-contiguity guard, and exposes the batch entry point relayers call.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::InboxError;
use crate::host::ContractInvoker;
use crate::inbox::Inbox;
use crate::types::{ChainId, MinedError, MinedRequest, RequestId};

/// Answers whether an address may submit batches.
pub trait Authorizer {
    fn is_authorized(&self, who: Address) -> bool;
}

// ============================================================================
// RELAY REGISTRY
// ============================================================================

/// Owner-gated allow-list of relayer addresses.
#[derive(Debug, Clone)]
pub struct RelayRegistry {
    owner: Address,
    authorized: HashSet<Address>,
}

impl RelayRegistry {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            authorized: HashSet::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), InboxError> {
        if caller != self.owner {
            return Err(InboxError::UnauthorizedOwner(caller));
        }
        Ok(())
    }

    pub fn add_authorized(&mut self, caller: Address, relayer: Address) -> Result<(), InboxError> {
        self.ensure_owner(caller)?;
        if self.authorized.insert(relayer) {
            info!("Relayer {} authorized", relayer);
        }
        Ok(())
    }

    pub fn remove_authorized(
        &mut self,
        caller: Address,
        relayer: Address,
    ) -> Result<(), InboxError> {
        self.ensure_owner(caller)?;
        if self.authorized.remove(&relayer) {
            info!("Relayer {} removed", relayer);
        }
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), InboxError> {
        self.ensure_owner(caller)?;
        info!("Registry ownership transferred from {} to {}", self.owner, new_owner);
        self.owner = new_owner;
        Ok(())
    }
}

impl Authorizer for RelayRegistry {
    fn is_authorized(&self, who: Address) -> bool {
        self.authorized.contains(&who)
    }
}

// ============================================================================
// GATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Require each mined request to carry exactly the next nonce from its source chain.
    pub enforce_nonce_contiguity: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enforce_nonce_contiguity: true,
        }
    }
}

pub struct MinerGate<A = RelayRegistry> {
    authorizer: A,
    config: GateConfig,
    last_accepted: HashMap<ChainId, RequestId>,
}

impl<A: Authorizer> MinerGate<A> {
    pub fn new(authorizer: A, config: GateConfig) -> Self {
        Self {
            authorizer,
            config,
            last_accepted: HashMap::new(),
        }
    }

    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }

    pub fn authorizer_mut(&mut self) -> &mut A {
        &mut self.authorizer
    }

    pub fn config(&self) -> GateConfig {
        self.config
    }

    /// Last request id accepted from `source_chain_id`, zero if none yet.
    pub fn last_incoming_request_id(&self, source_chain_id: ChainId) -> RequestId {
        self.last_accepted
            .get(&source_chain_id)
            .copied()
            .unwrap_or(RequestId::ZERO)
    }

    /// Delivers a relayer batch.
    ///
    /// Fails without touching any state on an unauthorized caller or a structural
    /// violation of the batch. Otherwise every item is processed in order and
    /// individual delivery failures are stored as errors.
    pub fn batch_process_requests(
        &mut self,
        inbox: &mut Inbox,
        host: &mut dyn ContractInvoker,
        caller: Address,
        source_chain_id: ChainId,
        requests: &[MinedRequest],
        errors: &[MinedError],
    ) -> Result<(), InboxError> {
        if !self.authorizer.is_authorized(caller) {
            warn!("Rejected batch from unauthorized relayer {}", caller);
            return Err(InboxError::UnauthorizedRelayer(caller));
        }
        if source_chain_id == inbox.chain_id() {
            return Err(InboxError::InvalidSourceChain(source_chain_id));
        }
        let advance_to = self.check_sequence(source_chain_id, requests)?;

        for request in requests {
            inbox.deliver_request(host, source_chain_id, request);
        }
        for error in errors {
            inbox.deliver_error(host, source_chain_id, error);
        }

        if let Some(advance_to) = advance_to {
            self.last_accepted.insert(source_chain_id, advance_to);
        }
        info!(
            "Batch from chain {} processed: {} requests, {} errors",
            source_chain_id,
            requests.len(),
            errors.len()
        );
        Ok(())
    }

    /// Checks origin and ordering of every request.
    ///
    /// Returns the highest id above the current marker, if any; the marker never moves back.
    fn check_sequence(
        &self,
        source_chain_id: ChainId,
        requests: &[MinedRequest],
    ) -> Result<Option<RequestId>, InboxError> {
        let source = U256::from(source_chain_id);
        let (_, last_nonce) = self.last_incoming_request_id(source_chain_id).unpack();
        let mut expected = last_nonce + U256::from(1u64);
        let mut advance_to: Option<(U256, RequestId)> = None;

        for request in requests {
            let (chain, nonce) = request.request_id.unpack();
            if chain != source {
                return Err(InboxError::ForeignRequestId {
                    source_chain_id,
                    request_id: request.request_id,
                });
            }
            if self.config.enforce_nonce_contiguity {
                if nonce != expected {
                    warn!(
                        "Nonce gap from chain {}: expected {}, got {}",
                        source_chain_id, expected, nonce
                    );
                    return Err(InboxError::NonceNotContiguous {
                        source_chain_id,
                        expected,
                        found: nonce,
                    });
                }
                expected += U256::from(1u64);
            }
            let highest = advance_to.map_or(last_nonce, |(nonce, _)| nonce);
            if nonce > highest {
                advance_to = Some((nonce, request.request_id));
            }
        }
        Ok(advance_to.map(|(_, request_id)| request_id))
    }
}
