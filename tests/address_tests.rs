//! Unit tests for address and value parsing
//!
//! These tests verify canonical address handling and the numeric parsers used for
//! indexed records and JSON-RPC results.

use ethereum_types::U256;
use std::collections::HashSet;
use std::str::FromStr;

use facilitator::address::{format_hash, format_quantity, parse_hash, parse_u256, u256_to_word, GlobalAddress};
use facilitator::error::RecordError;

/// Test that differently-cased inputs produce one canonical address
/// What is tested: Case-insensitive parsing and equality/hash on bytes
/// Why: Indexers and users mix checksum and lowercase forms; both must hit the same key
#[test]
fn test_address_case_insensitive() {
    let lower = GlobalAddress::from_str("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap();
    let upper = GlobalAddress::from_str("0x7E5F4552091A69125D5DFCB7B8C2659029395BDF").unwrap();
    let bare = GlobalAddress::from_str("7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap();

    assert_eq!(lower, upper);
    assert_eq!(lower, bare);

    let set: HashSet<GlobalAddress> = [lower, upper, bare].into_iter().collect();
    assert_eq!(set.len(), 1);
}

/// Test that Display renders the EIP-55 checksum
/// What is tested: Checksum casing of a well-known address
/// Why: Logs and RPC parameters should use the canonical checksum form
#[test]
fn test_address_checksum_display() {
    let address = GlobalAddress::from_str("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
    assert_eq!(address.to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

    let address = GlobalAddress::from_str("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359").unwrap();
    assert_eq!(address.to_string(), "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359");
}

/// Test that malformed addresses are rejected
/// What is tested: Wrong length and non-hex input
/// Why: A malformed record must be skipped, never stored under a bogus key
#[test]
fn test_address_rejects_malformed() {
    assert!(matches!(GlobalAddress::from_str("0x1234"), Err(RecordError::InvalidAddress(_))));
    assert!(matches!(
        GlobalAddress::from_str("0xzz5f4552091a69125d5dfcb7b8c2659029395bdf"),
        Err(RecordError::InvalidAddress(_))
    ));
    assert!(GlobalAddress::from_str("").is_err());
}

/// Test that numbers parse from decimal and hex
/// What is tested: parse_u256 with indexer (decimal) and RPC (hex) inputs
/// Why: Both encodings reach the facilitator
#[test]
fn test_parse_u256_decimal_and_hex() {
    assert_eq!(parse_u256("12345").unwrap(), U256::from(12345u64));
    assert_eq!(parse_u256("0x3039").unwrap(), U256::from(12345u64));
    assert_eq!(parse_u256("0x0").unwrap(), U256::zero());
    assert!(parse_u256("").is_err());
    assert!(parse_u256("0x").is_err());
    assert!(parse_u256("12a").is_err());
}

/// Test that hashes require exactly 32 bytes
/// What is tested: parse_hash length validation and formatting round trip
/// Why: Message hashes key messages and intents
#[test]
fn test_parse_hash() {
    let text = format!("0x{}", "ab".repeat(32));
    let hash = parse_hash(&text).unwrap();
    assert_eq!(format_hash(&hash), text);

    assert!(matches!(parse_hash("0xabcd"), Err(RecordError::InvalidHash(_))));
}

/// Test quantity and word encodings
/// What is tested: Minimal hex quantities and 32-byte big-endian words
/// Why: JSON-RPC expects minimal quantities; ABI and storage keys expect full words
#[test]
fn test_quantity_and_word_formats() {
    assert_eq!(format_quantity(U256::from(255u64)), "0xff");
    assert_eq!(format_quantity(U256::zero()), "0x0");

    let word = u256_to_word(U256::from(7u64));
    assert_eq!(word[31], 7);
    assert!(word[..31].iter().all(|b| *b == 0));
}
