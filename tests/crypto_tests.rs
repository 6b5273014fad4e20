//! Unit tests for cryptographic operations
//!
//! These tests verify address derivation and EIP-155 transaction signing.

use ethereum_types::U256;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

use facilitator::crypto::{transaction_hash, CryptoService, UnsignedTransaction};
use facilitator::proof::rlp;

#[path = "mod.rs"]
mod test_helpers;

use test_helpers::{addr, test_crypto_service, DUMMY_FACILITATOR_ADDRESS, DUMMY_GATEWAY, ORIGIN_CHAIN_ID};

fn unsigned(chain_id: u64) -> UnsignedTransaction {
    UnsignedTransaction {
        nonce: U256::from(4u64),
        gas_price: U256::from(1_000_000_000u64),
        gas: U256::from(210_000u64),
        to: addr(DUMMY_GATEWAY),
        value: U256::zero(),
        data: vec![0x09, 0x5e, 0xa7, 0xb3],
        chain_id,
    }
}

/// Test that private key 1 derives its well-known address
/// What is tested: get_ethereum_address
/// Why: The executor's sender must match the funded account
#[test]
fn test_ethereum_address_from_key() {
    let service = test_crypto_service();
    assert_eq!(service.get_ethereum_address().unwrap(), addr(DUMMY_FACILITATOR_ADDRESS));

    let unprefixed = CryptoService::from_private_key_hex(&format!("{}01", "00".repeat(31))).unwrap();
    assert_eq!(unprefixed.get_ethereum_address().unwrap(), addr(DUMMY_FACILITATOR_ADDRESS));
}

/// Test that malformed keys are rejected
/// What is tested: Wrong length, non-hex and zero keys
/// Why: A bad key must fail at startup, not at the first transaction
#[test]
fn test_invalid_private_keys() {
    assert!(CryptoService::from_private_key_hex("0x1234").is_err());
    assert!(CryptoService::from_private_key_hex(&format!("0x{}", "zz".repeat(32))).is_err());
    assert!(CryptoService::from_private_key_hex(&format!("0x{}", "00".repeat(32))).is_err());
    assert!(CryptoService::from_private_key_hex(&"00".repeat(31)).is_err());
}

/// Test that a signed transaction carries an EIP-155 v and recovers to the signer
/// What is tested: sign_legacy_transaction output fields and signature recovery
/// Why: Nodes reject transactions whose signature does not match the chain id
#[test]
fn test_signed_transaction_recovers_signer() {
    let service = test_crypto_service();
    let transaction = unsigned(ORIGIN_CHAIN_ID);
    let raw = service.sign_legacy_transaction(&transaction).unwrap();

    let list = rlp::decode_exact(&raw).unwrap();
    assert!(list.is_list);
    let items = rlp::list_items(list.payload).unwrap();
    assert_eq!(items.len(), 9);
    assert_eq!(U256::from_big_endian(items[0].payload), U256::from(4u64));
    assert_eq!(items[3].payload, addr(DUMMY_GATEWAY).as_bytes());
    assert_eq!(items[5].payload, &transaction.data[..]);

    let v = U256::from_big_endian(items[6].payload).as_u64();
    let recovery = v - (ORIGIN_CHAIN_ID * 2 + 35);
    assert!(recovery <= 1);

    let mut signature = [0u8; 64];
    let r = items[7].payload;
    let s = items[8].payload;
    signature[32 - r.len()..32].copy_from_slice(r);
    signature[64 - s.len()..].copy_from_slice(s);
    let signature = Signature::from_slice(&signature).unwrap();
    let recovery_id = RecoveryId::from_byte(recovery as u8).unwrap();
    let key = VerifyingKey::recover_from_prehash(&transaction.signing_hash(), &signature, recovery_id).unwrap();

    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    assert_eq!(&hash[12..], addr(DUMMY_FACILITATOR_ADDRESS).as_bytes());
}

/// Test that the chain id is bound into the signature
/// What is tested: Same transaction signed for two chains
/// Why: EIP-155 prevents replaying a confirmation on the other chain
#[test]
fn test_chain_id_changes_signature() {
    let service = test_crypto_service();
    let origin = service.sign_legacy_transaction(&unsigned(ORIGIN_CHAIN_ID)).unwrap();
    let auxiliary = service.sign_legacy_transaction(&unsigned(ORIGIN_CHAIN_ID + 1)).unwrap();

    assert_ne!(unsigned(ORIGIN_CHAIN_ID).signing_hash(), unsigned(ORIGIN_CHAIN_ID + 1).signing_hash());
    assert_ne!(transaction_hash(&origin), transaction_hash(&auxiliary));
}

/// Test that signing is deterministic
/// What is tested: RFC 6979 nonces give identical signatures for identical input
/// Why: Resending after a failure must produce the same transaction hash
#[test]
fn test_signing_is_deterministic() {
    let service = test_crypto_service();
    let first = service.sign_legacy_transaction(&unsigned(ORIGIN_CHAIN_ID)).unwrap();
    let second = service.sign_legacy_transaction(&unsigned(ORIGIN_CHAIN_ID)).unwrap();
    assert_eq!(first, second);
}
