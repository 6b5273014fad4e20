//! Proof Generator Module
//!
//! Builds the merkle proofs a destination gateway verifies: the source gateway's
//! account proof (for `proveGateway`) and storage proofs of its outbox mapping (for
//! `confirmDeposit` / `confirmWithdraw`). Proof nodes are returned by `eth_getProof`
//! and re-serialized as a single RLP list.

use anyhow::{Context, Result};
use ethereum_types::{H256, U256};
use sha3::{Digest, Keccak256};
use std::sync::Arc;
use tracing::debug;

use crate::address::{parse_hash, parse_u256, u256_to_word, GlobalAddress};
use crate::error::ProofError;
use crate::evm_client::{ChainRpc, RawProof};

pub mod rlp;

// ============================================================================
// PROOF DATA
// ============================================================================

/// Account and storage proofs of one contract at one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofData {
    pub address: GlobalAddress,
    pub block_number: U256,
    /// Raw account proof nodes
    pub account_proof: Vec<Vec<u8>>,
    /// Account proof nodes as one RLP list
    pub serialized_account_proof: Vec<u8>,
    /// Hex of the RLP-encoded account record held in the account leaf
    pub encoded_account_value: String,
    pub storage_proofs: Vec<StorageProofData>,
}

/// Proof of one storage slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageProofData {
    pub key: H256,
    pub value: U256,
    pub serialized_proof: Vec<u8>,
}

impl ProofData {
    /// Decodes the hex account value into bytes.
    pub fn encoded_account_value_bytes(&self) -> Result<Vec<u8>> {
        let clean = self.encoded_account_value.trim_start_matches("0x");
        hex::decode(clean).context("Invalid encoded account value")
    }
}

// ============================================================================
// PROOF GENERATOR
// ============================================================================

/// Generates proofs against one chain.
pub struct ProofGenerator {
    rpc: Arc<dyn ChainRpc>,
    /// Storage slot index of the gateway's outbox mapping
    outbox_offset: U256,
}

impl ProofGenerator {
    pub fn new(rpc: Arc<dyn ChainRpc>, outbox_offset: u64) -> Self {
        Self {
            rpc,
            outbox_offset: U256::from(outbox_offset),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.rpc.chain_id()
    }

    /// Fetches and shapes the proofs of `address` at `block_number`.
    ///
    /// # Arguments
    ///
    /// * `address` - Contract whose account (and optionally storage) is proven
    /// * `block_number` - Block whose state root the proof is against
    /// * `storage_index` - Storage slot index; `None` requests only the account proof
    /// * `keys` - Mapping keys applied to `storage_index`, innermost first
    ///
    /// # Returns
    ///
    /// * `Ok(ProofData)` - Shaped proof
    /// * `Err(anyhow::Error)` - RPC failure or malformed proof node
    pub async fn generate(
        &self,
        address: &GlobalAddress,
        block_number: U256,
        storage_index: Option<U256>,
        keys: &[H256],
    ) -> Result<ProofData> {
        let storage_keys = match storage_index {
            Some(index) => vec![storage_path(index, keys)],
            None => Vec::new(),
        };
        debug!(
            "Requesting proof for {} at block {} with {} storage keys",
            address,
            block_number,
            storage_keys.len()
        );

        let raw = self.rpc.get_proof(address, &storage_keys, block_number).await?;
        build_proof_data(*address, block_number, &raw)
            .with_context(|| format!("Malformed proof for {} at block {}", address, block_number))
    }

    /// Proof of the gateway's outbox.
    ///
    /// With message hashes, the storage proof is of `outbox[hash]`. Without keys only the
    /// account proof is requested.
    pub async fn get_outbox_proof(
        &self,
        gateway: &GlobalAddress,
        message_hashes: &[H256],
        block_number: U256,
    ) -> Result<ProofData> {
        let index = (!message_hashes.is_empty()).then_some(self.outbox_offset);
        self.generate(gateway, block_number, index, message_hashes).await
    }
}

// ============================================================================
// SHAPING
// ============================================================================

/// Storage slot of a mapping entry.
///
/// With no keys the slot is the index itself. Otherwise the slot is
/// keccak256(pad32(k1) ++ .. ++ pad32(kn) ++ pad32(index)), with the keys in the
/// given order.
pub fn storage_path(index: U256, keys: &[H256]) -> H256 {
    let index = u256_to_word(index);
    if keys.is_empty() {
        return H256::from(index);
    }
    let mut hasher = Keccak256::new();
    for key in keys {
        hasher.update(key.as_bytes());
    }
    hasher.update(index);
    H256::from_slice(&hasher.finalize())
}

/// Concatenates proof nodes into a single RLP list.
///
/// Each node must be exactly one RLP item.
pub fn serialize_proof<N: AsRef<[u8]>>(nodes: &[N]) -> Result<Vec<u8>, ProofError> {
    for node in nodes {
        rlp::decode_exact(node.as_ref())?;
    }
    Ok(rlp::encode_list(nodes))
}

/// Splits a serialized proof back into its nodes.
pub fn deserialize_proof(serialized: &[u8]) -> Result<Vec<Vec<u8>>, ProofError> {
    let item = rlp::decode_exact(serialized)?;
    if !item.is_list {
        return Err(ProofError::Rlp(alloy_rlp::Error::UnexpectedString));
    }
    Ok(rlp::list_items(item.payload)?.into_iter().map(|i| i.raw.to_vec()).collect())
}

/// Hex of the value stored in the account leaf: the last element of the last node.
pub fn encoded_account_value<N: AsRef<[u8]>>(account_proof: &[N]) -> Result<String, ProofError> {
    let leaf = account_proof.last().ok_or(ProofError::EmptyProof)?;
    let node = rlp::decode_exact(leaf.as_ref())?;
    if !node.is_list {
        return Err(ProofError::LeafNotList);
    }
    let items = rlp::list_items(node.payload)?;
    let value = items.last().ok_or(ProofError::LeafNotList)?;
    Ok(format!("0x{}", hex::encode(value.payload)))
}

fn decode_nodes(nodes: &[String]) -> Result<Vec<Vec<u8>>, ProofError> {
    nodes
        .iter()
        .map(|n| hex::decode(n.trim_start_matches("0x")).map_err(|_| ProofError::InvalidHex(n.clone())))
        .collect()
}

fn build_proof_data(address: GlobalAddress, block_number: U256, raw: &RawProof) -> Result<ProofData> {
    let account_proof = decode_nodes(&raw.account_proof)?;
    let serialized_account_proof = serialize_proof(&account_proof)?;
    let encoded_account_value = encoded_account_value(&account_proof)?;

    let mut storage_proofs = Vec::with_capacity(raw.storage_proof.len());
    for entry in &raw.storage_proof {
        let key = parse_storage_key(&entry.key)?;
        let value = parse_u256(&entry.value)?;
        let nodes = decode_nodes(&entry.proof)?;
        storage_proofs.push(StorageProofData {
            key,
            value,
            serialized_proof: serialize_proof(&nodes)?,
        });
    }

    Ok(ProofData {
        address,
        block_number,
        account_proof,
        serialized_account_proof,
        encoded_account_value,
        storage_proofs,
    })
}

/// Nodes may return storage keys without left padding.
fn parse_storage_key(key: &str) -> Result<H256> {
    let clean = key.trim_start_matches("0x");
    if clean.len() >= 64 {
        return Ok(parse_hash(key)?);
    }
    let padded = format!("{:0>64}", clean);
    Ok(parse_hash(&padded)?)
}
