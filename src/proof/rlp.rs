//! RLP helpers
//!
//! Thin layer over `alloy_rlp` headers for handling already-encoded items: proof
//! nodes, transaction fields, and lists built from them.

use alloy_rlp::{Encodable, Header};
use ethereum_types::U256;

use crate::error::ProofError;

/// One RLP item split off the front of a buffer.
#[derive(Debug, Clone, Copy)]
pub struct RlpItem<'a> {
    pub is_list: bool,
    /// Payload bytes (string content or concatenated list items)
    pub payload: &'a [u8],
    /// The complete item including its header
    pub raw: &'a [u8],
}

/// Splits the first RLP item off `buf`.
///
/// # Returns
///
/// * `Ok((RlpItem, rest))` - The item and the bytes following it
/// * `Err(ProofError)` - `buf` does not start with a well-formed item
pub fn split_item(buf: &[u8]) -> Result<(RlpItem<'_>, &[u8]), ProofError> {
    let mut cursor = buf;
    let header = Header::decode(&mut cursor)?;
    // Single bytes below 0x80 are their own encoding and leave the cursor in place.
    let header_len = buf.len() - cursor.len();
    if cursor.len() < header.payload_length {
        return Err(ProofError::Rlp(alloy_rlp::Error::InputTooShort));
    }
    let item_len = header_len + header.payload_length;
    let item = RlpItem {
        is_list: header.list,
        payload: &cursor[..header.payload_length],
        raw: &buf[..item_len],
    };
    Ok((item, &buf[item_len..]))
}

/// Decodes `buf` as exactly one RLP item.
pub fn decode_exact(buf: &[u8]) -> Result<RlpItem<'_>, ProofError> {
    let (item, rest) = split_item(buf)?;
    if !rest.is_empty() {
        return Err(ProofError::TrailingBytes(rest.len()));
    }
    Ok(item)
}

/// Splits a list payload into its items.
pub fn list_items(payload: &[u8]) -> Result<Vec<RlpItem<'_>>, ProofError> {
    let mut items = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let (item, next) = split_item(rest)?;
        items.push(item);
        rest = next;
    }
    Ok(items)
}

/// Wraps already-encoded items in a list header.
pub fn encode_list<I: AsRef<[u8]>>(items: &[I]) -> Vec<u8> {
    let payload_length = items.iter().map(|i| i.as_ref().len()).sum();
    let mut out = Vec::with_capacity(payload_length + 9);
    Header { list: true, payload_length }.encode(&mut out);
    for item in items {
        out.extend_from_slice(item.as_ref());
    }
    out
}

/// Encodes a byte string.
pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 9);
    Encodable::encode(bytes, &mut out);
    out
}

/// Encodes an unsigned integer as its minimal big-endian byte string.
pub fn encode_u256(value: U256) -> Vec<u8> {
    let word = crate::address::u256_to_word(value);
    let start = word.iter().position(|b| *b != 0).unwrap_or(word.len());
    encode_bytes(&word[start..])
}

pub fn encode_u64(value: u64) -> Vec<u8> {
    encode_u256(U256::from(value))
}
