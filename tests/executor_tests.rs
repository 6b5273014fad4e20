//! Unit tests for the transaction executor
//!
//! These tests verify queueing, nonce assignment, gas estimation and the polling loop
//! against an in-process chain.

use ethereum_types::U256;
use std::sync::Arc;
use std::time::Duration;

use facilitator::executor::{NonceTracker, TransactionExecutor};
use facilitator::proof::rlp;
use facilitator::repositories::TransactionRepository;

#[path = "mod.rs"]
mod test_helpers;

use test_helpers::{
    addr, message_hash, test_crypto_service, MockChain, DUMMY_COGATEWAY, DUMMY_FACILITATOR_ADDRESS, DUMMY_GATEWAY,
    MOCK_GAS_ESTIMATE, ORIGIN_CHAIN_ID,
};

const GAS_PRICE: u64 = 7;

fn build_executor(chain: Arc<MockChain>) -> (Arc<TransactionExecutor>, Arc<TransactionRepository>) {
    let repository = Arc::new(TransactionRepository::new());
    let executor = TransactionExecutor::new(
        repository.clone(),
        chain,
        test_crypto_service(),
        U256::from(GAS_PRICE),
        Duration::from_millis(10),
    )
    .unwrap();
    (Arc::new(executor), repository)
}

/// Decodes the first fields of a signed legacy transaction: nonce, gasPrice, gas, to.
fn signed_fields(raw: &[u8]) -> (U256, U256, U256, Vec<u8>) {
    let list = rlp::decode_exact(raw).unwrap();
    let items = rlp::list_items(list.payload).unwrap();
    (
        U256::from_big_endian(items[0].payload),
        U256::from_big_endian(items[1].payload),
        U256::from_big_endian(items[2].payload),
        items[3].payload.to_vec(),
    )
}

// ============================================================================
// QUEUE
// ============================================================================

/// Test that add stores a pending transaction from the facilitator account
/// What is tested: add and has_queued
/// Why: Gateway proofs rely on has_queued to avoid queuing the same call twice
#[tokio::test]
async fn test_add_and_has_queued() {
    let (executor, repository) = build_executor(MockChain::new(ORIGIN_CHAIN_ID));

    let queued = executor.add(addr(DUMMY_GATEWAY), vec![0xaa, 0xbb]).await.unwrap();
    assert_eq!(queued.id, 1);
    assert_eq!(queued.chain_id, ORIGIN_CHAIN_ID);
    assert_eq!(queued.from_address, addr(DUMMY_FACILITATOR_ADDRESS));
    assert_eq!(queued.gas_price, U256::from(GAS_PRICE));
    assert!(queued.is_pending());

    assert!(executor.has_queued(&addr(DUMMY_GATEWAY), &[0xaa, 0xbb]).await);
    assert!(!executor.has_queued(&addr(DUMMY_GATEWAY), &[0xaa]).await);
    assert!(!executor.has_queued(&addr(DUMMY_COGATEWAY), &[0xaa, 0xbb]).await);
    assert_eq!(repository.all().await.len(), 1);
}

/// Test that confirmations are tracked by message, not by calldata
/// What is tested: add_confirmation and has_confirmation
/// Why: Two messages may produce identical calldata and must both be confirmed
#[tokio::test]
async fn test_confirmations_tracked_by_message() {
    let (executor, repository) = build_executor(MockChain::new(ORIGIN_CHAIN_ID));

    let first = executor
        .add_confirmation(addr(DUMMY_GATEWAY), vec![0xcc], message_hash(1))
        .await
        .unwrap();
    assert_eq!(first.message_hash, Some(message_hash(1)));
    assert!(executor.has_confirmation(&message_hash(1)).await);
    assert!(!executor.has_confirmation(&message_hash(2)).await);

    executor
        .add_confirmation(addr(DUMMY_GATEWAY), vec![0xcc], message_hash(2))
        .await
        .unwrap();
    assert!(executor.has_confirmation(&message_hash(2)).await);
    assert_eq!(repository.all().await.len(), 2);

    // Plain calls carry no message
    let plain = executor.add(addr(DUMMY_GATEWAY), vec![0xcc]).await.unwrap();
    assert_eq!(plain.message_hash, None);
}

/// Test that execute_next with an empty queue does nothing
/// What is tested: Idle poll
/// Why: The loop polls constantly; an idle poll must not touch the chain
#[tokio::test]
async fn test_execute_next_idle() {
    let chain = MockChain::new(ORIGIN_CHAIN_ID);
    let (executor, _) = build_executor(chain.clone());

    assert!(executor.execute_next().await.unwrap().is_none());
    assert!(chain.sent().is_empty());
    assert_eq!(chain.pending_count_calls(), 0);
}

// ============================================================================
// SENDING
// ============================================================================

/// Test that transactions are sent oldest first with consecutive nonces
/// What is tested: FIFO order, nonce seeding once, gas estimate, record stamping
/// Why: Out-of-order nonces stall the account on chain
#[tokio::test]
async fn test_execute_sends_in_order_with_consecutive_nonces() {
    let chain = MockChain::new(ORIGIN_CHAIN_ID);
    chain.set_pending_count(5);
    let (executor, repository) = build_executor(chain.clone());

    let first = executor.add(addr(DUMMY_GATEWAY), vec![0x01]).await.unwrap();
    let second = executor.add(addr(DUMMY_COGATEWAY), vec![0x02]).await.unwrap();

    let sent_first = executor.execute_next().await.unwrap().unwrap();
    let sent_second = executor.execute_next().await.unwrap().unwrap();
    assert!(executor.execute_next().await.unwrap().is_none());

    assert_eq!(sent_first.id, first.id);
    assert_eq!(sent_second.id, second.id);
    assert_eq!(sent_first.nonce, Some(U256::from(5u64)));
    assert_eq!(sent_second.nonce, Some(U256::from(6u64)));
    assert_eq!(sent_first.gas, Some(U256::from(MOCK_GAS_ESTIMATE)));
    assert!(sent_first.transaction_hash.is_some());
    assert_eq!(chain.pending_count_calls(), 1);

    let raw = chain.sent();
    assert_eq!(raw.len(), 2);
    let (nonce, gas_price, gas, to) = signed_fields(&raw[0]);
    assert_eq!(nonce, U256::from(5u64));
    assert_eq!(gas_price, U256::from(GAS_PRICE));
    assert_eq!(gas, U256::from(MOCK_GAS_ESTIMATE));
    assert_eq!(to, addr(DUMMY_GATEWAY).as_bytes().to_vec());

    let stored = repository.get(first.id).await.unwrap();
    assert!(!stored.is_pending());
}

/// Test that a failed send keeps the record pending and reuses the nonce
/// What is tested: Nonce release and retry after a broadcast failure
/// Why: A skipped nonce blocks every later transaction of the account
#[tokio::test]
async fn test_send_failure_releases_nonce() {
    let chain = MockChain::new(ORIGIN_CHAIN_ID);
    chain.set_pending_count(3);
    let (executor, repository) = build_executor(chain.clone());
    let queued = executor.add(addr(DUMMY_GATEWAY), vec![0x01]).await.unwrap();

    chain.fail_sends(true);
    assert!(executor.execute_next().await.is_err());
    assert!(repository.get(queued.id).await.unwrap().is_pending());

    chain.fail_sends(false);
    let sent = executor.execute_next().await.unwrap().unwrap();
    assert_eq!(sent.id, queued.id);
    assert_eq!(sent.nonce, Some(U256::from(3u64)));
    assert_eq!(chain.pending_count_calls(), 1);
}

/// Test that executors on different chains share a queue without crossing
/// What is tested: dequeue filters by chain id
/// Why: The transaction repository is shared by both executors
#[tokio::test]
async fn test_executors_only_send_own_chain() {
    let repository = Arc::new(TransactionRepository::new());
    let origin_chain = MockChain::new(ORIGIN_CHAIN_ID);
    let auxiliary_chain = MockChain::new(ORIGIN_CHAIN_ID + 1);
    let origin = TransactionExecutor::new(
        repository.clone(),
        origin_chain.clone(),
        test_crypto_service(),
        U256::one(),
        Duration::from_millis(10),
    )
    .unwrap();
    let auxiliary = TransactionExecutor::new(
        repository.clone(),
        auxiliary_chain.clone(),
        test_crypto_service(),
        U256::one(),
        Duration::from_millis(10),
    )
    .unwrap();

    auxiliary.add(addr(DUMMY_COGATEWAY), vec![0x09]).await.unwrap();
    assert!(origin.execute_next().await.unwrap().is_none());
    assert!(auxiliary.execute_next().await.unwrap().is_some());
    assert!(origin_chain.sent().is_empty());
    assert_eq!(auxiliary_chain.sent().len(), 1);
}

// ============================================================================
// NONCE TRACKER
// ============================================================================

/// Test that release only rewinds the most recent nonce
/// What is tested: release of an older nonce is ignored
/// Why: Rewinding past a broadcast nonce would reuse it
#[tokio::test]
async fn test_nonce_release_only_latest() {
    let chain = MockChain::new(ORIGIN_CHAIN_ID);
    let tracker = NonceTracker::new(chain.clone(), addr(DUMMY_FACILITATOR_ADDRESS));

    assert_eq!(tracker.next_nonce().await.unwrap(), U256::zero());
    assert_eq!(tracker.next_nonce().await.unwrap(), U256::one());
    tracker.release(U256::zero()).await;
    assert_eq!(tracker.next_nonce().await.unwrap(), U256::from(2u64));

    tracker.release(U256::from(2u64)).await;
    assert_eq!(tracker.next_nonce().await.unwrap(), U256::from(2u64));
    assert_eq!(chain.pending_count_calls(), 1);
}

// ============================================================================
// POLLING LOOP
// ============================================================================

/// Test that the polling loop sends queued transactions and stops on request
/// What is tested: start / stop
/// Why: The facilitator relies on the loop to drain the queue and to shut down cleanly
#[tokio::test]
async fn test_polling_loop_sends_and_stops() {
    let chain = MockChain::new(ORIGIN_CHAIN_ID);
    let (executor, repository) = build_executor(chain.clone());
    executor.add(addr(DUMMY_GATEWAY), vec![0x01]).await.unwrap();
    executor.add(addr(DUMMY_GATEWAY), vec![0x02]).await.unwrap();

    let handle = executor.start();
    for _ in 0..100 {
        if chain.sent().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    executor.stop();
    tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

    assert_eq!(chain.sent().len(), 2);
    assert!(repository.all().await.iter().all(|t| !t.is_pending()));
}
