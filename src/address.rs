//! Address and Value Parsing
//!
//! Canonical ("global") addresses used to key every stored entity, and parsers for the
//! hex and decimal strings that indexed records carry.

use ethereum_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::RecordError;

// ============================================================================
// GLOBAL ADDRESS
// ============================================================================

/// A 20-byte account address in canonical form.
///
/// Two addresses that differ only in letter case compare equal. `Display` renders the
/// EIP-55 mixed-case checksum form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GlobalAddress(H160);

impl GlobalAddress {
    /// Wraps raw address bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(H160(bytes))
    }

    pub fn zero() -> Self {
        Self(H160::zero())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns the EIP-55 checksummed representation.
    ///
    /// A hex letter is upper-cased when the matching nibble of
    /// keccak256(lowercase hex) is 8 or more.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0.as_bytes());
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for GlobalAddress {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean = strip_hex_prefix(s.trim());
        if clean.len() != 40 {
            return Err(RecordError::InvalidAddress(s.to_string()));
        }
        let bytes = hex::decode(clean).map_err(|_| RecordError::InvalidAddress(s.to_string()))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self::from_bytes(out))
    }
}

impl fmt::Display for GlobalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for GlobalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalAddress({})", self.to_checksum())
    }
}

// ============================================================================
// VALUE PARSING
// ============================================================================

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

/// Parses a 32-byte hash such as a message hash or storage key.
pub fn parse_hash(s: &str) -> Result<H256, RecordError> {
    let clean = strip_hex_prefix(s.trim());
    if clean.len() != 64 {
        return Err(RecordError::InvalidHash(s.to_string()));
    }
    let bytes = hex::decode(clean).map_err(|_| RecordError::InvalidHash(s.to_string()))?;
    Ok(H256::from_slice(&bytes))
}

/// Parses an unsigned 256-bit number.
///
/// Indexers emit decimal strings; JSON-RPC endpoints emit `0x`-prefixed hex. Both are
/// accepted.
pub fn parse_u256(s: &str) -> Result<U256, RecordError> {
    let trimmed = s.trim();
    let parsed = if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        let clean = strip_hex_prefix(trimmed);
        if clean.is_empty() {
            return Err(RecordError::InvalidNumber(s.to_string()));
        }
        U256::from_str_radix(clean, 16).ok()
    } else if trimmed.is_empty() {
        None
    } else {
        U256::from_dec_str(trimmed).ok()
    };
    parsed.ok_or_else(|| RecordError::InvalidNumber(s.to_string()))
}

/// Formats a hash as `0x` followed by 64 lowercase hex characters.
pub fn format_hash(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

/// Formats a number as minimal `0x` hex, the JSON-RPC quantity encoding.
pub fn format_quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

/// Returns the 32-byte big-endian representation of a number.
pub fn u256_to_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}
