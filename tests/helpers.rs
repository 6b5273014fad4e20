//! Shared test helpers for unit tests
//!
//! This module provides helper functions used by unit tests.
//!
//! The module is organized into several categories:
//! - **Configuration Builders**: Functions to create test configurations
//! - **Mock Chain**: An in-process `ChainRpc` that serves canned proofs and records sends
//! - **Proof Fixtures**: RLP-encoded account and storage proof nodes
//! - **Record Builders**: Indexed records with sensible defaults

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use ethereum_types::{H256, U256};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use facilitator::address::{format_hash, format_quantity, GlobalAddress};
use facilitator::config::Config;
use facilitator::crypto::{transaction_hash, CryptoService};
use facilitator::evm_client::{CallRequest, ChainRpc, RawProof, RawStorageProof};
use facilitator::handlers::{
    AvailableStateRootRecord, ConfirmIntentRecord, CreatedUtilityTokenRecord, DeclaredDepositIntentRecord,
    DeclaredWithdrawIntentRecord, GatewayProvenRecord,
};
use facilitator::proof::{rlp, serialize_proof, storage_path};
use facilitator::repositories::Repositories;
use facilitator::seed::SeedData;

// ============================================================================
// CONSTANTS
// ============================================================================

// ------------------------- CONTRACTS -------------------------

/// Anchor on the origin chain (tracks auxiliary state roots)
pub const DUMMY_ORIGIN_ANCHOR: &str = "0x00000000000000000000000000000000000000a1";

/// Anchor on the auxiliary chain (tracks origin state roots)
pub const DUMMY_AUXILIARY_ANCHOR: &str = "0x00000000000000000000000000000000000000a2";

/// Gateway on the origin chain
pub const DUMMY_GATEWAY: &str = "0x00000000000000000000000000000000000000b1";

/// Cogateway on the auxiliary chain
pub const DUMMY_COGATEWAY: &str = "0x00000000000000000000000000000000000000b2";

/// Gateway nobody monitors
pub const DUMMY_UNKNOWN_GATEWAY: &str = "0x00000000000000000000000000000000000000bf";

// --------------------------- TOKENS --------------------------

/// Value token on the origin chain
pub const DUMMY_VALUE_TOKEN: &str = "0x00000000000000000000000000000000000000c1";

/// Utility token minted for `DUMMY_VALUE_TOKEN` on the auxiliary chain
pub const DUMMY_UTILITY_TOKEN: &str = "0x00000000000000000000000000000000000000c2";

/// A second value token with no pair
pub const DUMMY_OTHER_TOKEN: &str = "0x00000000000000000000000000000000000000c3";

// ---------------------------- USERS --------------------------

pub const DUMMY_DEPOSITOR: &str = "0x00000000000000000000000000000000000000d1";
pub const DUMMY_WITHDRAWER: &str = "0x00000000000000000000000000000000000000d2";
pub const DUMMY_BENEFICIARY: &str = "0x00000000000000000000000000000000000000d3";
pub const DUMMY_SECOND_SENDER: &str = "0x00000000000000000000000000000000000000d4";

// ---------------------------- KEYS ---------------------------

/// Private key 1; its address is 0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf
pub const DUMMY_PRIVATE_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
pub const DUMMY_FACILITATOR_ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

// ------------------------- IDENTIFIERS -----------------------

pub const ORIGIN_CHAIN_ID: u64 = 1337;
pub const AUXILIARY_CHAIN_ID: u64 = 1338;

/// Outbox mapping slot of the gateways
pub const OUTBOX_OFFSET: u64 = 7;

/// Gas returned by the mock chain's estimate
pub const MOCK_GAS_ESTIMATE: u64 = 210_000;

// ============================================================================
// PARSING SHORTCUTS
// ============================================================================

pub fn addr(s: &str) -> GlobalAddress {
    GlobalAddress::from_str(s).unwrap()
}

/// Message hash with `n` in the last byte
pub fn message_hash(n: u8) -> H256 {
    H256::from_low_u64_be(n as u64)
}

pub fn message_hash_str(n: u8) -> String {
    format_hash(&message_hash(n))
}

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Build a valid test configuration using the dummy contracts
pub fn build_test_config() -> Config {
    let mut config = Config::default();
    config.origin.anchor_addr = DUMMY_ORIGIN_ANCHOR.to_string();
    config.auxiliary.anchor_addr = DUMMY_AUXILIARY_ANCHOR.to_string();
    config.gateway.origin_gateway_addr = DUMMY_GATEWAY.to_string();
    config.gateway.auxiliary_cogateway_addr = DUMMY_COGATEWAY.to_string();
    config.origin.chain_id = ORIGIN_CHAIN_ID;
    config.auxiliary.chain_id = AUXILIARY_CHAIN_ID;
    config.facilitator.polling_interval_ms = 10;
    config
}

pub fn test_crypto_service() -> Arc<CryptoService> {
    Arc::new(CryptoService::from_private_key_hex(DUMMY_PRIVATE_KEY).unwrap())
}

/// Repositories seeded with the dummy gateway pair and both anchors
pub async fn seeded_repositories() -> Arc<Repositories> {
    let repositories = Arc::new(Repositories::new());
    SeedData::from_config(&build_test_config())
        .unwrap()
        .populate(&repositories)
        .await
        .unwrap();
    repositories
}

// ============================================================================
// PROOF FIXTURES
// ============================================================================

/// RLP account record [nonce, balance, storageRoot, codeHash]
pub fn account_rlp() -> Vec<u8> {
    rlp::encode_list(&[
        rlp::encode_u64(1),
        rlp::encode_u64(0),
        rlp::encode_bytes(&[0x11; 32]),
        rlp::encode_bytes(&[0x22; 32]),
    ])
}

/// Account proof: a branch-like node followed by a leaf whose value is `account_rlp()`
pub fn account_proof_nodes() -> Vec<Vec<u8>> {
    let branch = rlp::encode_list(&[rlp::encode_bytes(&[0x33; 32]), rlp::encode_bytes(&[])]);
    let leaf = rlp::encode_list(&[rlp::encode_bytes(&[0x20, 0xab]), rlp::encode_bytes(&account_rlp())]);
    vec![branch, leaf]
}

/// Storage proof of `key`: a single leaf whose path is the key and whose value is `value`
pub fn storage_proof_nodes(key: &H256, value: u64) -> Vec<Vec<u8>> {
    let mut path = vec![0x20];
    path.extend_from_slice(key.as_bytes());
    vec![rlp::encode_list(&[rlp::encode_bytes(&path), rlp::encode_bytes(&rlp::encode_u64(value))])]
}

/// Serialized storage proof that the mock chain returns for `outbox[message_hash]`
pub fn outbox_storage_proof(message_hash: H256, value: u64) -> Vec<u8> {
    let key = storage_path(U256::from(OUTBOX_OFFSET), &[message_hash]);
    serialize_proof(&storage_proof_nodes(&key, value)).unwrap()
}

fn hex_nodes(nodes: &[Vec<u8>]) -> Vec<String> {
    nodes.iter().map(|n| format!("0x{}", hex::encode(n))).collect()
}

/// `eth_getProof` result for the given storage keys, every slot holding `value`
pub fn raw_proof(storage_keys: &[H256], value: u64) -> RawProof {
    raw_proof_with(storage_keys, |_| value)
}

/// `eth_getProof` result where each slot holds `value_of(key)`
pub fn raw_proof_with(storage_keys: &[H256], value_of: impl Fn(&H256) -> u64) -> RawProof {
    RawProof {
        account_proof: hex_nodes(&account_proof_nodes()),
        storage_hash: Some(format!("0x{}", "11".repeat(32))),
        storage_proof: storage_keys
            .iter()
            .map(|key| {
                let value = value_of(key);
                RawStorageProof {
                    key: format_hash(key),
                    value: format_quantity(U256::from(value)),
                    proof: hex_nodes(&storage_proof_nodes(key, value)),
                }
            })
            .collect(),
    }
}

// ============================================================================
// MOCK CHAIN
// ============================================================================

/// One recorded `get_proof` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRequest {
    pub address: GlobalAddress,
    pub storage_keys: Vec<H256>,
    pub block_number: U256,
}

/// In-process chain: serves proofs with a configurable storage value, counts nonces,
/// and records every broadcast transaction.
pub struct MockChain {
    chain_id: u64,
    storage_value: Mutex<u64>,
    empty_slots: Mutex<HashSet<H256>>,
    pending_count: Mutex<U256>,
    fail_proofs: AtomicBool,
    fail_sends: AtomicBool,
    proof_requests: Mutex<Vec<ProofRequest>>,
    sent: Mutex<Vec<Vec<u8>>>,
    pending_count_calls: Mutex<usize>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Arc<Self> {
        Arc::new(Self {
            chain_id,
            storage_value: Mutex::new(1),
            empty_slots: Mutex::new(HashSet::new()),
            pending_count: Mutex::new(U256::zero()),
            fail_proofs: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            proof_requests: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            pending_count_calls: Mutex::new(0),
        })
    }

    pub fn set_storage_value(&self, value: u64) {
        *self.storage_value.lock().unwrap() = value;
    }

    /// Makes `outbox[message_hash]` read as zero
    pub fn clear_outbox_slot(&self, message_hash: H256) {
        let key = storage_path(U256::from(OUTBOX_OFFSET), &[message_hash]);
        self.empty_slots.lock().unwrap().insert(key);
    }

    /// Makes every outbox slot read `storage_value` again
    pub fn fill_outbox_slots(&self) {
        self.empty_slots.lock().unwrap().clear();
    }

    pub fn set_pending_count(&self, count: u64) {
        *self.pending_count.lock().unwrap() = U256::from(count);
    }

    pub fn fail_proofs(&self, fail: bool) {
        self.fail_proofs.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn proof_requests(&self) -> Vec<ProofRequest> {
        self.proof_requests.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn pending_count_calls(&self) -> usize {
        *self.pending_count_calls.lock().unwrap()
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_proof(&self, address: &GlobalAddress, storage_keys: &[H256], block_number: U256) -> Result<RawProof> {
        self.proof_requests.lock().unwrap().push(ProofRequest {
            address: *address,
            storage_keys: storage_keys.to_vec(),
            block_number,
        });
        if self.fail_proofs.load(Ordering::SeqCst) {
            anyhow::bail!("JSON-RPC error from mock (eth_getProof): header not found (code: -32000)");
        }
        let value = *self.storage_value.lock().unwrap();
        let empty_slots = self.empty_slots.lock().unwrap().clone();
        Ok(raw_proof_with(storage_keys, |key| if empty_slots.contains(key) { 0 } else { value }))
    }

    async fn estimate_gas(&self, _call: &CallRequest) -> Result<U256> {
        Ok(U256::from(MOCK_GAS_ESTIMATE))
    }

    async fn get_pending_transaction_count(&self, _address: &GlobalAddress) -> Result<U256> {
        *self.pending_count_calls.lock().unwrap() += 1;
        Ok(*self.pending_count.lock().unwrap())
    }

    async fn send_raw_transaction(&self, raw_transaction: &[u8]) -> Result<H256> {
        if self.fail_sends.load(Ordering::SeqCst) {
            anyhow::bail!("JSON-RPC error from mock (eth_sendRawTransaction): nonce too low (code: -32000)");
        }
        self.sent.lock().unwrap().push(raw_transaction.to_vec());
        Ok(H256::from(transaction_hash(raw_transaction)))
    }
}

// ============================================================================
// RECORD BUILDERS
// ============================================================================

pub fn state_root_record(anchor: &str, block: u64) -> AvailableStateRootRecord {
    AvailableStateRootRecord {
        contract_address: anchor.to_string(),
        block_number: block.to_string(),
    }
}

pub fn gateway_proven_record(acceptor: &str, proven: &str, block: u64) -> GatewayProvenRecord {
    GatewayProvenRecord {
        contract_address: acceptor.to_string(),
        remote_gateway: proven.to_string(),
        block_number: block.to_string(),
    }
}

pub fn created_utility_token_record() -> CreatedUtilityTokenRecord {
    CreatedUtilityTokenRecord {
        contract_address: DUMMY_COGATEWAY.to_string(),
        value_token: DUMMY_VALUE_TOKEN.to_string(),
        utility_token: DUMMY_UTILITY_TOKEN.to_string(),
        block_number: Some("5".to_string()),
    }
}

/// Deposit of 100 value tokens declared on the dummy gateway
pub fn declared_deposit_record(hash: u8, depositor: &str, nonce: u64, block: u64) -> DeclaredDepositIntentRecord {
    DeclaredDepositIntentRecord {
        contract_address: DUMMY_GATEWAY.to_string(),
        message_hash: message_hash_str(hash),
        value_token: DUMMY_VALUE_TOKEN.to_string(),
        amount: "100".to_string(),
        beneficiary: DUMMY_BENEFICIARY.to_string(),
        fee_gas_price: "1".to_string(),
        fee_gas_limit: "50000".to_string(),
        depositor: depositor.to_string(),
        nonce: nonce.to_string(),
        block_number: block.to_string(),
    }
}

/// Withdraw of 40 utility tokens declared on the dummy cogateway
pub fn declared_withdraw_record(hash: u8, withdrawer: &str, nonce: u64, block: u64) -> DeclaredWithdrawIntentRecord {
    DeclaredWithdrawIntentRecord {
        contract_address: DUMMY_COGATEWAY.to_string(),
        message_hash: message_hash_str(hash),
        utility_token: DUMMY_UTILITY_TOKEN.to_string(),
        amount: "40".to_string(),
        beneficiary: DUMMY_BENEFICIARY.to_string(),
        fee_gas_price: "2".to_string(),
        fee_gas_limit: "60000".to_string(),
        withdrawer: withdrawer.to_string(),
        nonce: nonce.to_string(),
        block_number: block.to_string(),
    }
}

pub fn confirm_record(destination: &str, hash: u8) -> ConfirmIntentRecord {
    ConfirmIntentRecord {
        contract_address: destination.to_string(),
        message_hash: message_hash_str(hash),
        block_number: Some("30".to_string()),
    }
}
