//! Request ledger: every request, response and error record a chain owns.
//!
//! Mutations go through a handful of entry points. While a checkpoint is
//! open each mutation is journaled so a reverted call can be undone, giving
//! the same all-or-nothing behavior as a reverted EVM call frame.

use std::collections::HashMap;

use alloy_primitives::Address;
use tracing::debug;

use crate::types::{
    ChainId, ErrorRecord, InboxEvent, MethodCall, Request, RequestId, ResponseRecord, Selector,
};

/// Undo information for one mutation.
#[derive(Debug, Clone)]
enum JournalEntry {
    RequestCreated(RequestId),
    IncomingInserted(RequestId),
    OutgoingExecuted(RequestId),
    IncomingExecuted(RequestId),
    ResponseStored(RequestId),
    ErrorStored(RequestId),
    EventEmitted,
}

/// Position in the journal to revert to.
#[derive(Debug)]
#[must_use = "a checkpoint must be reverted or released"]
pub struct Checkpoint {
    journal_len: usize,
}

/// Fields of a new outgoing request; id, timestamp and `executed` are assigned by the ledger.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub target_chain_id: ChainId,
    pub target_contract: Address,
    pub method_call: MethodCall,
    pub caller_contract: Address,
    pub original_sender: Address,
    pub callback_selector: Selector,
    pub error_selector: Selector,
    pub is_two_way: bool,
    pub source_request_id: RequestId,
}

#[derive(Debug)]
pub struct RequestLedger {
    chain_id: ChainId,
    nonce: u64,
    outgoing: HashMap<RequestId, Request>,
    incoming: HashMap<RequestId, Request>,
    responses: HashMap<RequestId, ResponseRecord>,
    errors: HashMap<RequestId, ErrorRecord>,
    error_log: Vec<RequestId>,
    events: Vec<InboxEvent>,
    journal: Vec<JournalEntry>,
    open_checkpoints: usize,
}

impl RequestLedger {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            nonce: 0,
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            responses: HashMap::new(),
            errors: HashMap::new(),
            error_log: Vec::new(),
            events: Vec::new(),
            journal: Vec::new(),
            open_checkpoints: 0,
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    fn record(&mut self, entry: JournalEntry) {
        if self.open_checkpoints > 0 {
            self.journal.push(entry);
        }
    }

    // ========================================================================
    // OUTGOING REQUESTS
    // ========================================================================

    /// Allocates the next nonce and stores the request with `executed = false`.
    pub fn create_request(&mut self, new: OutgoingRequest, timestamp: u64) -> RequestId {
        self.nonce += 1;
        let request_id = RequestId::from_parts(self.chain_id, self.nonce);
        let request = Request {
            request_id,
            target_chain_id: new.target_chain_id,
            target_contract: new.target_contract,
            method_call: new.method_call,
            caller_contract: new.caller_contract,
            original_sender: new.original_sender,
            timestamp,
            callback_selector: new.callback_selector,
            error_selector: new.error_selector,
            is_two_way: new.is_two_way,
            executed: false,
            source_request_id: new.source_request_id,
        };
        self.outgoing.insert(request_id, request.clone());
        self.record(JournalEntry::RequestCreated(request_id));
        self.emit(InboxEvent::MessageSent(request));
        request_id
    }

    pub fn request(&self, request_id: &RequestId) -> Option<&Request> {
        self.outgoing.get(request_id)
    }

    /// Flips an outgoing request to executed; returns false if unknown or already executed.
    pub fn mark_outgoing_executed(&mut self, request_id: &RequestId) -> bool {
        match self.outgoing.get_mut(request_id) {
            Some(request) if !request.executed => {
                request.executed = true;
                self.record(JournalEntry::OutgoingExecuted(*request_id));
                true
            }
            _ => false,
        }
    }

    pub fn requests_len(&self) -> u64 {
        self.nonce
    }

    /// Nonce-ordered page of outgoing requests; index `i` holds nonce `i + 1`.
    pub fn get_requests(&self, from: u64, len: u64) -> Vec<Request> {
        let end = from.saturating_add(len).min(self.nonce);
        (from..end)
            .filter_map(|index| {
                self.outgoing
                    .get(&RequestId::from_parts(self.chain_id, index + 1))
                    .cloned()
            })
            .collect()
    }

    // ========================================================================
    // INCOMING REQUESTS
    // ========================================================================

    pub fn incoming_request(&self, request_id: &RequestId) -> Option<&Request> {
        self.incoming.get(request_id)
    }

    /// Stores a materialized incoming request unless one already exists.
    pub fn insert_incoming(&mut self, request: Request) -> bool {
        if self.incoming.contains_key(&request.request_id) {
            return false;
        }
        let request_id = request.request_id;
        self.incoming.insert(request_id, request);
        self.record(JournalEntry::IncomingInserted(request_id));
        true
    }

    pub fn mark_incoming_executed(&mut self, request_id: &RequestId) -> bool {
        match self.incoming.get_mut(request_id) {
            Some(request) if !request.executed => {
                request.executed = true;
                self.record(JournalEntry::IncomingExecuted(*request_id));
                true
            }
            _ => false,
        }
    }

    // ========================================================================
    // RESPONSES AND ERRORS
    // ========================================================================

    /// Set-once response keyed by the original request id.
    pub fn store_response(&mut self, original_id: RequestId, record: ResponseRecord) -> bool {
        if self.responses.contains_key(&original_id) {
            return false;
        }
        self.responses.insert(original_id, record);
        self.record(JournalEntry::ResponseStored(original_id));
        true
    }

    pub fn response(&self, request_id: &RequestId) -> Option<&ResponseRecord> {
        self.responses.get(request_id)
    }

    /// Set-once error record; also appended to the error log.
    pub fn store_error(&mut self, record: ErrorRecord) -> bool {
        let request_id = record.request_id;
        if self.errors.contains_key(&request_id) {
            return false;
        }
        self.errors.insert(request_id, record);
        self.error_log.push(request_id);
        self.record(JournalEntry::ErrorStored(request_id));
        true
    }

    pub fn error(&self, request_id: &RequestId) -> Option<&ErrorRecord> {
        self.errors.get(request_id)
    }

    pub fn errors_len(&self) -> u64 {
        self.error_log.len() as u64
    }

    /// Insertion-ordered page of error records.
    pub fn get_errors(&self, from: u64, len: u64) -> Vec<ErrorRecord> {
        let start = usize::try_from(from).unwrap_or(usize::MAX);
        let take = usize::try_from(len).unwrap_or(usize::MAX);
        self.error_log
            .iter()
            .skip(start)
            .take(take)
            .filter_map(|request_id| self.errors.get(request_id).cloned())
            .collect()
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    pub fn emit(&mut self, event: InboxEvent) {
        self.events.push(event);
        self.record(JournalEntry::EventEmitted);
    }

    /// Drains events emitted so far. Call between transactions only.
    pub fn take_events(&mut self) -> Vec<InboxEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // JOURNAL
    // ========================================================================

    pub fn checkpoint(&mut self) -> Checkpoint {
        self.open_checkpoints += 1;
        Checkpoint {
            journal_len: self.journal.len(),
        }
    }

    /// Keeps changes made since `checkpoint`.
    pub fn release(&mut self, _checkpoint: Checkpoint) {
        self.close_checkpoint();
    }

    /// Undoes every mutation made since `checkpoint`.
    pub fn revert_to(&mut self, checkpoint: Checkpoint) {
        let undone = self.journal.len().saturating_sub(checkpoint.journal_len);
        while self.journal.len() > checkpoint.journal_len {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        debug!("Reverted {} ledger mutations", undone);
        self.close_checkpoint();
    }

    fn close_checkpoint(&mut self) {
        self.open_checkpoints = self.open_checkpoints.saturating_sub(1);
        if self.open_checkpoints == 0 {
            self.journal.clear();
        }
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::RequestCreated(request_id) => {
                self.outgoing.remove(&request_id);
                self.nonce -= 1;
            }
            JournalEntry::IncomingInserted(request_id) => {
                self.incoming.remove(&request_id);
            }
            JournalEntry::OutgoingExecuted(request_id) => {
                if let Some(request) = self.outgoing.get_mut(&request_id) {
                    request.executed = false;
                }
            }
            JournalEntry::IncomingExecuted(request_id) => {
                if let Some(request) = self.incoming.get_mut(&request_id) {
                    request.executed = false;
                }
            }
            JournalEntry::ResponseStored(request_id) => {
                self.responses.remove(&request_id);
            }
            JournalEntry::ErrorStored(request_id) => {
                self.errors.remove(&request_id);
                self.error_log.pop();
            }
            JournalEntry::EventEmitted => {
                self.events.pop();
            }
        }
    }
}
