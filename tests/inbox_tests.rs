//! Integration tests for the inbox core
//!
//! Covers request creation, the execution context seen by delivered
//! contracts, responses and the read accessors.

use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, Bytes, U256};
use inbox_gmp::{
    InboxError, InboxEvent, MethodCall, RequestId, Selector, DELIVERY_FAILED,
};
#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    add_calldata, authorized_chain, destination_chain, mine_requests, on_add_result_selector,
    on_error_selector, request_id, ADDER, CHAIN_A, CHAIN_B, PROBE, RELAYER, SOURCE_APP,
};

// ============================================================================
// SENDING
// ============================================================================

/// 1. Test: Two-Way Request Creation
/// Verifies that a two-way send stores a request with the next nonce and emits MessageSent.
/// Why: Relayers read outgoing requests by index and rely on their fields.
#[test]
fn test_two_way_request_creation() {
    let mut chain = authorized_chain(CHAIN_A);

    let id = chain
        .inbox_mut()
        .send_two_way_message(
            SOURCE_APP,
            CHAIN_B,
            ADDER,
            MethodCall::raw(add_calldata(7, 9)),
            on_add_result_selector(),
            on_error_selector(),
        )
        .unwrap();

    assert_eq!(id, request_id(CHAIN_A, 1));
    let requests = chain.inbox().get_requests(0, 10);
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.target_chain_id, CHAIN_B);
    assert_eq!(request.target_contract, ADDER);
    assert_eq!(request.caller_contract, SOURCE_APP);
    assert_eq!(request.original_sender, SOURCE_APP);
    assert!(request.is_two_way);
    assert!(!request.executed);
    assert!(request.source_request_id.is_zero());

    let events = chain.inbox_mut().take_events();
    assert_eq!(events, vec![InboxEvent::MessageSent(request.clone())]);
}

/// 2. Test: Nonces Increase Per Chain
/// Verifies that consecutive sends get nonces 1, 2, 3 with the chain id in the high half.
/// Why: Nonce contiguity on the destination depends on gap-free numbering.
#[test]
fn test_nonces_increase_per_chain() {
    let mut chain = authorized_chain(CHAIN_A);
    for expected in 1..=3u64 {
        let id = chain
            .inbox_mut()
            .send_one_way_message(
                SOURCE_APP,
                CHAIN_B,
                PROBE,
                MethodCall::raw(vec![1u8, 2, 3, 4]),
                Selector::ZERO,
            )
            .unwrap();
        assert_eq!(id.chain_id(), Some(CHAIN_A));
        assert_eq!(id.nonce(), Some(expected));
    }
    assert_eq!(chain.inbox().get_requests_len(), 3);
}

/// 3. Test: Invalid Targets Leave No Trace
/// Verifies that same-chain and zero-address targets are rejected without storing anything.
/// Why: Failed sends must not consume a nonce.
#[test]
fn test_invalid_targets_leave_no_trace() {
    let mut chain = authorized_chain(CHAIN_A);
    let same_chain = chain.inbox_mut().send_one_way_message(
        SOURCE_APP,
        CHAIN_A,
        PROBE,
        MethodCall::raw(vec![0u8; 4]),
        Selector::ZERO,
    );
    assert_eq!(same_chain, Err(InboxError::SameChainTarget(CHAIN_A)));

    let zero_target = chain.inbox_mut().send_two_way_message(
        SOURCE_APP,
        CHAIN_B,
        Address::ZERO,
        MethodCall::raw(vec![0u8; 4]),
        on_add_result_selector(),
        Selector::ZERO,
    );
    assert_eq!(zero_target, Err(InboxError::ZeroTargetAddress));

    assert_eq!(chain.inbox().get_requests_len(), 0);
    assert!(chain.inbox_mut().take_events().is_empty());
}

// ============================================================================
// EXECUTION CONTEXT
// ============================================================================

/// 4. Test: No Context Outside Delivery
/// Verifies that inboxMsgSender and respond fail when nothing is being delivered.
/// Why: Contracts must not be able to impersonate a remote caller.
#[test]
fn test_no_context_outside_delivery() {
    let mut chain = authorized_chain(CHAIN_B);
    assert_eq!(
        chain.inbox().inbox_msg_sender(),
        Err(InboxError::NoActiveContext)
    );
    assert_eq!(
        chain.inbox_mut().respond(ADDER, Bytes::from_static(b"x")),
        Err(InboxError::NoActiveContext)
    );
    assert!(chain.inbox().execution_context().is_none());
}

/// 5. Test: Delivered Contract Sees Remote Caller
/// Verifies that the target observes (source chain, source contract) and the context clears afterwards.
/// Why: Targets authorize cross-chain calls by their remote origin.
#[test]
fn test_delivered_contract_sees_remote_caller() {
    let mut source = authorized_chain(CHAIN_A);
    let probe_calls = Arc::new(Mutex::new(Vec::new()));
    let mut destination = destination_chain(Arc::default(), probe_calls.clone());

    source
        .inbox_mut()
        .send_one_way_message(
            SOURCE_APP,
            CHAIN_B,
            PROBE,
            MethodCall::raw(vec![0xde, 0xad, 0xbe, 0xef]),
            Selector::ZERO,
        )
        .unwrap();
    destination
        .batch_process_requests(RELAYER, CHAIN_A, &mine_requests(&source, 0), &[])
        .unwrap();

    let calls = probe_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(calls[0].1, (CHAIN_A, SOURCE_APP));
    assert!(destination.inbox().execution_context().is_none());
}

// ============================================================================
// RESPONSES
// ============================================================================

/// 6. Test: Respond Queues Response Toward Original Sender
/// Verifies that a target's respond creates a one-way request back to the original sender.
/// Why: The response carries the callback selector and links to the original id.
#[test]
fn test_respond_queues_response_toward_original_sender() {
    let mut source = authorized_chain(CHAIN_A);
    let adder_senders = Arc::new(Mutex::new(Vec::new()));
    let mut destination = destination_chain(adder_senders.clone(), Arc::default());

    let original = source
        .inbox_mut()
        .send_two_way_message(
            SOURCE_APP,
            CHAIN_B,
            ADDER,
            MethodCall::raw(add_calldata(2, 3)),
            on_add_result_selector(),
            on_error_selector(),
        )
        .unwrap();
    destination
        .batch_process_requests(RELAYER, CHAIN_A, &mine_requests(&source, 0), &[])
        .unwrap();

    assert_eq!(*adder_senders.lock().unwrap(), vec![(CHAIN_A, SOURCE_APP)]);
    let responses = destination.inbox().get_requests(0, 10);
    assert_eq!(responses.len(), 1);
    let response = &responses[0];
    assert_eq!(response.request_id, request_id(CHAIN_B, 1));
    assert_eq!(response.target_chain_id, CHAIN_A);
    assert_eq!(response.target_contract, SOURCE_APP);
    assert_eq!(response.caller_contract, ADDER);
    assert_eq!(response.source_request_id, original);
    assert!(response.is_response());
    assert_eq!(response.method_call.selector, on_add_result_selector());

    let record = destination.inbox().get_inbox_response(&original).unwrap();
    assert_eq!(record.response_request_id, response.request_id);
    assert_eq!(
        U256::from_be_slice(&record.response),
        U256::from(5u64)
    );
    assert_eq!(destination.inbox().get_errors_len(), 0);
}

/// 7. Test: Respond Without Callback Fails Delivery
/// Verifies that responding to a request with a zero callback selector reverts the target.
/// Why: A response nobody can receive must not be queued.
#[test]
fn test_respond_without_callback_fails_delivery() {
    let mut source = authorized_chain(CHAIN_A);
    let mut destination = destination_chain(Arc::default(), Arc::default());

    let original = source
        .inbox_mut()
        .send_two_way_message(
            SOURCE_APP,
            CHAIN_B,
            ADDER,
            MethodCall::raw(add_calldata(2, 3)),
            Selector::ZERO,
            on_error_selector(),
        )
        .unwrap();
    destination
        .batch_process_requests(RELAYER, CHAIN_A, &mine_requests(&source, 0), &[])
        .unwrap();

    assert_eq!(destination.inbox().get_requests_len(), 0);
    let error = destination.inbox().get_outbox_error(&original).unwrap();
    assert_eq!(error.error_code, DELIVERY_FAILED);
}

// ============================================================================
// ACCESSORS
// ============================================================================

/// 8. Test: Request Pagination Clamps
/// Verifies that getRequests returns at most the available range and nothing past the end.
/// Why: Relayers page through requests without knowing the exact length.
#[test]
fn test_request_pagination_clamps() {
    let mut chain = authorized_chain(CHAIN_A);
    for _ in 0..5 {
        chain
            .inbox_mut()
            .send_one_way_message(
                SOURCE_APP,
                CHAIN_B,
                PROBE,
                MethodCall::raw(vec![0u8; 4]),
                Selector::ZERO,
            )
            .unwrap();
    }

    let page = chain.inbox().get_requests(3, 10);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].request_id, request_id(CHAIN_A, 4));
    assert!(chain.inbox().get_requests(5, 1).is_empty());
    assert!(chain.inbox().get_requests(0, 0).is_empty());
}

/// 9. Test: Missing Records Are Reported
/// Verifies that unknown ids yield ErrorNotFound and ResponseNotFound.
/// Why: Callers distinguish "no record" from an empty record.
#[test]
fn test_missing_records_are_reported() {
    let chain = authorized_chain(CHAIN_A);
    let unknown = request_id(CHAIN_B, 99);
    assert_eq!(
        chain.inbox().get_outbox_error(&unknown),
        Err(InboxError::ErrorNotFound(unknown))
    );
    assert_eq!(
        chain.inbox().get_inbox_response(&unknown),
        Err(InboxError::ResponseNotFound(unknown))
    );
}

/// 10. Test: Request Id Components Are Bounded
/// Verifies that packing rejects chain ids or nonces wider than 128 bits.
/// Why: Each half of the id holds exactly 128 bits.
#[test]
fn test_request_id_components_are_bounded() {
    let too_wide = U256::from(1u64) << 128;
    assert!(matches!(
        RequestId::pack(too_wide, U256::from(1u64)),
        Err(InboxError::IdComponentOverflow { .. })
    ));
    assert!(matches!(
        RequestId::pack(U256::from(1u64), too_wide),
        Err(InboxError::IdComponentOverflow { .. })
    ));
    let max = (U256::from(1u64) << 128) - U256::from(1u64);
    let id = RequestId::pack(max, max).unwrap();
    assert_eq!(id.unpack(), (max, max));
}
