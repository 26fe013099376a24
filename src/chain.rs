//! In-process chain: the deployable unit composing the inbox core, the
//! miner gate and the hosted contracts.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use chrono::Utc;
use tracing::debug;

use crate::error::InboxError;
use crate::host::{Contract, ContractInvoker, ContractRegistry};
use crate::inbox::Inbox;
use crate::miner_gate::{GateConfig, MinerGate, RelayRegistry};
use crate::secure_compute::SecureCompute;
use crate::types::{ChainId, MinedError, MinedRequest, RequestId};

pub struct LocalChain {
    inbox: Inbox,
    gate: MinerGate<RelayRegistry>,
    contracts: ContractRegistry,
}

impl LocalChain {
    pub fn new(chain_id: ChainId, owner: Address, secure_compute: Arc<dyn SecureCompute>) -> Self {
        Self::with_gate_config(chain_id, owner, secure_compute, GateConfig::default())
    }

    pub fn with_gate_config(
        chain_id: ChainId,
        owner: Address,
        secure_compute: Arc<dyn SecureCompute>,
        config: GateConfig,
    ) -> Self {
        Self {
            inbox: Inbox::new(chain_id, secure_compute),
            gate: MinerGate::new(RelayRegistry::new(owner), config),
            contracts: ContractRegistry::new(),
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.inbox.chain_id()
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn inbox_mut(&mut self) -> &mut Inbox {
        &mut self.inbox
    }

    pub fn registry(&self) -> &RelayRegistry {
        self.gate.authorizer()
    }

    pub fn registry_mut(&mut self) -> &mut RelayRegistry {
        self.gate.authorizer_mut()
    }

    pub fn deploy(&mut self, address: Address, contract: Box<dyn Contract>) {
        debug!("Contract deployed at {} on chain {}", address, self.chain_id());
        self.contracts.deploy(address, contract);
    }

    /// Runs a top-level transaction against a hosted contract.
    ///
    /// Ledger changes are discarded if the contract reverts.
    pub fn call(&mut self, target: Address, calldata: &[u8]) -> Result<Bytes, Bytes> {
        self.tick();
        let checkpoint = self.inbox.ledger_mut().checkpoint();
        let outcome = self.contracts.invoke(&mut self.inbox, target, calldata);
        match outcome {
            Ok(_) => self.inbox.ledger_mut().release(checkpoint),
            Err(_) => self.inbox.ledger_mut().revert_to(checkpoint),
        }
        outcome
    }

    pub fn batch_process_requests(
        &mut self,
        caller: Address,
        source_chain_id: ChainId,
        requests: &[MinedRequest],
        errors: &[MinedError],
    ) -> Result<(), InboxError> {
        self.tick();
        self.gate.batch_process_requests(
            &mut self.inbox,
            &mut self.contracts,
            caller,
            source_chain_id,
            requests,
            errors,
        )
    }

    pub fn last_incoming_request_id(&self, source_chain_id: ChainId) -> RequestId {
        self.gate.last_incoming_request_id(source_chain_id)
    }

    fn tick(&mut self) {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        self.inbox.set_block_timestamp(now);
    }
}
