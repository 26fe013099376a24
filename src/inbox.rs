//! Inbox core.
//!
//! Creates outgoing requests, scopes the execution context around every
//! nested contract call, and implements the per-item delivery logic that
//! `MinerGate::batch_process_requests` drives.

use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use tracing::{debug, info, warn};

use crate::codec::{self, MethodCallBuilder};
use crate::error::InboxError;
use crate::host::ContractInvoker;
use crate::ledger::{OutgoingRequest, RequestLedger};
use crate::secure_compute::SecureCompute;
use crate::types::{
    ChainId, ErrorRecord, ExecutionContext, InboxEvent, MethodCall, MinedError, MinedRequest,
    Request, RequestId, ResponseRecord, Selector, DELIVERY_FAILED,
};

pub struct Inbox {
    ledger: RequestLedger,
    context: Option<ExecutionContext>,
    secure_compute: Arc<dyn SecureCompute>,
    block_timestamp: u64,
}

impl Inbox {
    pub fn new(chain_id: ChainId, secure_compute: Arc<dyn SecureCompute>) -> Self {
        Self {
            ledger: RequestLedger::new(chain_id),
            context: None,
            secure_compute,
            block_timestamp: 0,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.ledger.chain_id()
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut RequestLedger {
        &mut self.ledger
    }

    /// Timestamp stamped on requests created from now on.
    pub fn set_block_timestamp(&mut self, timestamp: u64) {
        self.block_timestamp = timestamp;
    }

    // ========================================================================
    // SENDING
    // ========================================================================

    /// Creates a request whose success is reported to `callback_selector` on `caller`.
    pub fn send_two_way_message(
        &mut self,
        caller: Address,
        target_chain_id: ChainId,
        target_contract: Address,
        method_call: MethodCall,
        callback_selector: Selector,
        error_selector: Selector,
    ) -> Result<RequestId, InboxError> {
        self.send(OutgoingRequest {
            target_chain_id,
            target_contract,
            method_call,
            caller_contract: caller,
            original_sender: caller,
            callback_selector,
            error_selector,
            is_two_way: true,
            source_request_id: RequestId::ZERO,
        })
    }

    /// Creates a fire-and-forget request; only failures are reported back.
    pub fn send_one_way_message(
        &mut self,
        caller: Address,
        target_chain_id: ChainId,
        target_contract: Address,
        method_call: MethodCall,
        error_selector: Selector,
    ) -> Result<RequestId, InboxError> {
        self.send(OutgoingRequest {
            target_chain_id,
            target_contract,
            method_call,
            caller_contract: caller,
            original_sender: caller,
            callback_selector: Selector::ZERO,
            error_selector,
            is_two_way: false,
            source_request_id: RequestId::ZERO,
        })
    }

    fn send(&mut self, request: OutgoingRequest) -> Result<RequestId, InboxError> {
        if request.target_chain_id == self.chain_id() {
            return Err(InboxError::SameChainTarget(request.target_chain_id));
        }
        if request.target_contract == Address::ZERO {
            return Err(InboxError::ZeroTargetAddress);
        }
        let target_chain_id = request.target_chain_id;
        let is_two_way = request.is_two_way;
        let request_id = self.ledger.create_request(request, self.block_timestamp);
        info!(
            "Request {} created: target_chain={}, two_way={}",
            request_id, target_chain_id, is_two_way
        );
        Ok(request_id)
    }

    /// Answers the request currently being delivered with a one-way response.
    ///
    /// The response targets the incoming request's original sender and calls its
    /// callback selector with `data` as the only argument.
    pub fn respond(&mut self, caller: Address, data: Bytes) -> Result<RequestId, InboxError> {
        let context = self.context.ok_or(InboxError::NoActiveContext)?;
        let incoming = self
            .ledger
            .incoming_request(&context.request_id)
            .cloned()
            .ok_or(InboxError::IncomingRequestNotFound(context.request_id))?;
        if incoming.original_sender == Address::ZERO {
            return Err(InboxError::OriginalSenderUnresolved(incoming.request_id));
        }
        if incoming.callback_selector == Selector::ZERO {
            return Err(InboxError::CallbackNotSet(incoming.request_id));
        }

        let mut builder = MethodCallBuilder::new(incoming.callback_selector, 1);
        builder.add_bytes(&data);
        let method_call = builder.build()?;

        let response_request_id = self.send(OutgoingRequest {
            target_chain_id: context.remote_chain_id,
            target_contract: incoming.original_sender,
            method_call,
            caller_contract: caller,
            original_sender: incoming.original_sender,
            callback_selector: Selector::ZERO,
            error_selector: incoming.error_selector,
            is_two_way: false,
            source_request_id: incoming.request_id,
        })?;

        if self.ledger.store_response(
            incoming.request_id,
            ResponseRecord {
                response_request_id,
                response: data.clone(),
            },
        ) {
            self.ledger.emit(InboxEvent::ResponseReceived {
                request_id: incoming.request_id,
                response_request_id,
                response: data,
            });
        }
        debug!(
            "Response {} queued for request {}",
            response_request_id, incoming.request_id
        );
        Ok(response_request_id)
    }

    // ========================================================================
    // CONTEXT AND ACCESSORS
    // ========================================================================

    /// `(remote chain, remote contract)` of the request being delivered.
    pub fn inbox_msg_sender(&self) -> Result<(ChainId, Address), InboxError> {
        self.context
            .map(|context| (context.remote_chain_id, context.remote_contract))
            .ok_or(InboxError::NoActiveContext)
    }

    pub fn execution_context(&self) -> Option<ExecutionContext> {
        self.context
    }

    pub fn get_outbox_error(&self, request_id: &RequestId) -> Result<&ErrorRecord, InboxError> {
        self.ledger
            .error(request_id)
            .ok_or(InboxError::ErrorNotFound(*request_id))
    }

    pub fn get_inbox_response(
        &self,
        request_id: &RequestId,
    ) -> Result<&ResponseRecord, InboxError> {
        self.ledger
            .response(request_id)
            .ok_or(InboxError::ResponseNotFound(*request_id))
    }

    pub fn get_requests(&self, from: u64, len: u64) -> Vec<Request> {
        self.ledger.get_requests(from, len)
    }

    pub fn get_requests_len(&self) -> u64 {
        self.ledger.requests_len()
    }

    pub fn get_errors(&self, from: u64, len: u64) -> Vec<ErrorRecord> {
        self.ledger.get_errors(from, len)
    }

    pub fn get_errors_len(&self) -> u64 {
        self.ledger.errors_len()
    }

    pub fn take_events(&mut self) -> Vec<InboxEvent> {
        self.ledger.take_events()
    }

    // ========================================================================
    // DELIVERY
    // ========================================================================

    /// Delivers one mined request. Target failures become stored errors.
    pub(crate) fn deliver_request(
        &mut self,
        host: &mut dyn ContractInvoker,
        source_chain_id: ChainId,
        mined: &MinedRequest,
    ) {
        let request_id = mined.request_id;
        if self.ledger.insert_incoming(Request {
            request_id,
            target_chain_id: self.chain_id(),
            target_contract: mined.target_contract,
            method_call: mined.method_call.clone(),
            caller_contract: mined.source_contract,
            original_sender: mined.source_contract,
            timestamp: self.block_timestamp,
            callback_selector: mined.callback_selector,
            error_selector: mined.error_selector,
            is_two_way: mined.is_two_way,
            executed: false,
            source_request_id: mined.source_request_id,
        }) {
            debug!("Incoming request {} materialized", request_id);
        }

        let Some(incoming) = self.ledger.incoming_request(&request_id).cloned() else {
            return;
        };
        if incoming.executed {
            debug!("Request {} already executed, skipping", request_id);
            return;
        }

        let context = ExecutionContext {
            remote_chain_id: source_chain_id,
            remote_contract: incoming.original_sender,
            request_id,
        };
        let (calldata, outcome) =
            match codec::reencode(&incoming.method_call, self.secure_compute.as_ref()) {
                Ok(calldata) => {
                    let outcome =
                        self.execute_in_context(host, context, incoming.target_contract, &calldata);
                    (calldata, outcome)
                }
                Err(e) => {
                    warn!("Request {} could not be re-encoded: {}", request_id, e);
                    (Bytes::new(), Err(Bytes::from(e.to_string().into_bytes())))
                }
            };

        self.ledger.mark_incoming_executed(&request_id);
        self.ledger.emit(InboxEvent::RequestExecuted {
            request_id,
            source_chain_id,
        });

        match outcome {
            Ok(_) => info!("Request {} delivered to {}", request_id, incoming.target_contract),
            Err(revert) => {
                warn!(
                    "Request {} delivery failed ({} bytes of revert data)",
                    request_id,
                    revert.len()
                );
                self.record_error(ErrorRecord {
                    request_id,
                    error_code: DELIVERY_FAILED,
                    error_message: revert,
                });
            }
        }

        if incoming.is_response() {
            self.complete_response(source_chain_id, &incoming, calldata);
        }
    }

    /// Stores the response on the original outgoing request and closes it.
    fn complete_response(&mut self, source_chain_id: ChainId, incoming: &Request, calldata: Bytes) {
        let original_id = incoming.source_request_id;
        let original = self
            .ledger
            .request(&original_id)
            .map(|original| (original.target_chain_id, original.executed));
        match original {
            Some((target_chain_id, _)) if target_chain_id != source_chain_id => {
                warn!(
                    "Response {} from chain {} answers request {} sent to chain {}",
                    incoming.request_id, source_chain_id, original_id, target_chain_id
                );
            }
            Some((_, true)) => {
                debug!("Request {} already completed", original_id);
            }
            Some((_, false)) => {
                let record = ResponseRecord {
                    response_request_id: incoming.request_id,
                    response: calldata.clone(),
                };
                if self.ledger.store_response(original_id, record) {
                    self.ledger.emit(InboxEvent::ResponseReceived {
                        request_id: original_id,
                        response_request_id: incoming.request_id,
                        response: calldata,
                    });
                }
                self.ledger.mark_outgoing_executed(&original_id);
                info!("Request {} completed by response {}", original_id, incoming.request_id);
            }
            None => {
                warn!(
                    "Response {} references unknown request {}",
                    incoming.request_id, original_id
                );
            }
        }
    }

    /// Applies one mined error to the original outgoing request and notifies its sender.
    pub(crate) fn deliver_error(
        &mut self,
        host: &mut dyn ContractInvoker,
        source_chain_id: ChainId,
        mined: &MinedError,
    ) {
        let request_id = mined.request_id;
        let original = match self.ledger.request(&request_id) {
            Some(original) if original.target_chain_id != source_chain_id => {
                warn!(
                    "Error for request {} claimed by chain {}, request targets chain {}",
                    request_id, source_chain_id, original.target_chain_id
                );
                return;
            }
            Some(original) if original.executed => {
                debug!("Request {} already executed, ignoring error", request_id);
                return;
            }
            Some(original) => original.clone(),
            None => {
                warn!("Error references unknown request {}", request_id);
                return;
            }
        };

        self.record_error(ErrorRecord {
            request_id,
            error_code: mined.error_code,
            error_message: mined.error_message.clone(),
        });
        self.ledger.mark_outgoing_executed(&request_id);

        if original.error_selector == Selector::ZERO {
            return;
        }
        let mut calldata = original.error_selector.to_vec();
        calldata.extend_from_slice(
            &(request_id.0, mined.error_code, mined.error_message.clone())
                .abi_encode_params(),
        );
        let context = ExecutionContext {
            remote_chain_id: source_chain_id,
            remote_contract: original.target_contract,
            request_id,
        };
        if let Err(revert) =
            self.execute_in_context(host, context, original.original_sender, &calldata)
        {
            warn!(
                "Error handler for request {} reverted ({} bytes), ignoring",
                request_id,
                revert.len()
            );
        }
    }

    fn record_error(&mut self, record: ErrorRecord) {
        let event = InboxEvent::ErrorReceived {
            request_id: record.request_id,
            error_code: record.error_code,
            error_message: record.error_message.clone(),
        };
        if self.ledger.store_error(record) {
            self.ledger.emit(event);
        }
    }

    /// Runs a nested call with `context` active, restoring the previous context afterwards.
    ///
    /// Ledger changes made by a failed call are rolled back.
    fn execute_in_context(
        &mut self,
        host: &mut dyn ContractInvoker,
        context: ExecutionContext,
        target: Address,
        calldata: &[u8],
    ) -> Result<Bytes, Bytes> {
        let previous = self.context.replace(context);
        let checkpoint = self.ledger.checkpoint();
        let outcome = host.invoke(self, target, calldata);
        match outcome {
            Ok(_) => self.ledger.release(checkpoint),
            Err(_) => self.ledger.revert_to(checkpoint),
        }
        self.context = previous;
        outcome
    }
}
