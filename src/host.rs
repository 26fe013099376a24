//! Contract invocation boundary.
//!
//! The inbox never executes contract code itself. It hands `(target, calldata)`
//! to a `ContractInvoker` and gets back either return data or revert data.
//! `ContractRegistry` is the in-process implementation used by `LocalChain`.

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;

use crate::codec::selector_of;
use crate::error::InboxError;
use crate::inbox::Inbox;
use crate::types::{ChainId, MethodCall, RequestId, Selector};

/// Invokes a contract on behalf of the inbox.
pub trait ContractInvoker {
    /// Returns the call's return data, or its revert data on failure.
    fn invoke(&mut self, inbox: &mut Inbox, target: Address, calldata: &[u8])
        -> Result<Bytes, Bytes>;
}

/// Application contract hosted in-process.
pub trait Contract: Send {
    fn call(&mut self, env: &mut CallEnv<'_>, calldata: &[u8]) -> Result<Bytes, Bytes>;
}

/// What a hosted contract can see and do while it runs.
pub struct CallEnv<'a> {
    inbox: &'a mut Inbox,
    address: Address,
}

impl<'a> CallEnv<'a> {
    pub fn new(inbox: &'a mut Inbox, address: Address) -> Self {
        Self { inbox, address }
    }

    /// Address of the running contract.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn inbox(&self) -> &Inbox {
        &*self.inbox
    }

    /// Remote `(chain, contract)` of the request being delivered.
    pub fn msg_sender(&self) -> Result<(ChainId, Address), InboxError> {
        self.inbox.inbox_msg_sender()
    }

    pub fn respond(&mut self, data: Bytes) -> Result<RequestId, InboxError> {
        self.inbox.respond(self.address, data)
    }

    pub fn send_two_way_message(
        &mut self,
        target_chain_id: ChainId,
        target_contract: Address,
        method_call: MethodCall,
        callback_selector: Selector,
        error_selector: Selector,
    ) -> Result<RequestId, InboxError> {
        self.inbox.send_two_way_message(
            self.address,
            target_chain_id,
            target_contract,
            method_call,
            callback_selector,
            error_selector,
        )
    }

    pub fn send_one_way_message(
        &mut self,
        target_chain_id: ChainId,
        target_contract: Address,
        method_call: MethodCall,
        error_selector: Selector,
    ) -> Result<RequestId, InboxError> {
        self.inbox.send_one_way_message(
            self.address,
            target_chain_id,
            target_contract,
            method_call,
            error_selector,
        )
    }
}

/// Address-keyed set of hosted contracts.
#[derive(Default)]
pub struct ContractRegistry {
    contracts: HashMap<Address, Box<dyn Contract>>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `contract` at `address`, replacing whatever was there.
    pub fn deploy(&mut self, address: Address, contract: Box<dyn Contract>) {
        self.contracts.insert(address, contract);
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }
}

impl ContractInvoker for ContractRegistry {
    fn invoke(
        &mut self,
        inbox: &mut Inbox,
        target: Address,
        calldata: &[u8],
    ) -> Result<Bytes, Bytes> {
        let contract = self
            .contracts
            .get_mut(&target)
            .ok_or_else(|| revert_with(&format!("no contract at {target}")))?;
        let mut env = CallEnv::new(inbox, target);
        contract.call(&mut env, calldata)
    }
}

/// Solidity-style `Error(string)` revert data.
pub fn revert_with(reason: &str) -> Bytes {
    let mut data = selector_of("Error(string)").to_vec();
    data.extend_from_slice(&reason.to_owned().abi_encode());
    data.into()
}
