//! EVM Client Module
//!
//! This module provides a client for communicating with EVM-compatible blockchain nodes
//! via their JSON-RPC API. It covers the calls the facilitator needs: account and
//! storage proofs, gas estimation, pending nonces and raw transaction submission.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethereum_types::{H256, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::address::{format_hash, format_quantity, parse_hash, parse_u256, GlobalAddress};

// ============================================================================
// API RESPONSE STRUCTURES
// ============================================================================

/// EVM JSON-RPC request wrapper
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<serde_json::Value>,
    id: u64,
}

/// EVM JSON-RPC response wrapper
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcError>,
    #[allow(dead_code)]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

/// Response of `eth_getProof`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProof {
    /// Account trie nodes from the state root down to the account leaf (hex)
    pub account_proof: Vec<String>,
    #[serde(default)]
    pub storage_hash: Option<String>,
    #[serde(default)]
    pub storage_proof: Vec<RawStorageProof>,
}

/// One storage slot entry of an `eth_getProof` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawStorageProof {
    pub key: String,
    /// Slot value as a hex quantity
    pub value: String,
    /// Storage trie nodes from the storage root down to the slot leaf (hex)
    pub proof: Vec<String>,
}

/// Transaction receipt subset used to wait for inclusion
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    /// "0x1" on success, "0x0" on revert
    pub status: Option<String>,
}

/// Call used for gas estimation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: GlobalAddress,
    pub to: GlobalAddress,
    pub data: Vec<u8>,
    pub gas_price: Option<U256>,
}

// ============================================================================
// CHAIN RPC ABSTRACTION
// ============================================================================

/// The chain operations the facilitator depends on.
///
/// `EvmClient` implements this over JSON-RPC; tests substitute an in-process chain.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Fetches the account proof of `address` and the storage proofs of `storage_keys`
    /// at `block_number`.
    async fn get_proof(&self, address: &GlobalAddress, storage_keys: &[H256], block_number: U256) -> Result<RawProof>;

    async fn estimate_gas(&self, call: &CallRequest) -> Result<U256>;

    /// Transaction count of `address` including pending transactions.
    async fn get_pending_transaction_count(&self, address: &GlobalAddress) -> Result<U256>;

    /// Broadcasts a signed transaction and returns its hash.
    async fn send_raw_transaction(&self, raw_transaction: &[u8]) -> Result<H256>;
}

// ============================================================================
// EVM CLIENT IMPLEMENTATION
// ============================================================================

/// Client for communicating with EVM-compatible blockchain nodes via JSON-RPC
pub struct EvmClient {
    /// HTTP client for making requests
    client: Client,
    /// Base URL of the EVM node (e.g., "http://127.0.0.1:8545")
    base_url: String,
    /// Chain id the node is expected to serve
    chain_id: u64,
}

impl EvmClient {
    /// Creates a new EVM client for the given node URL
    ///
    /// # Arguments
    ///
    /// * `node_url` - Base URL of the EVM node (e.g., "http://127.0.0.1:8545")
    /// * `chain_id` - Chain id used when signing transactions for this node
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    ///
    /// * `Ok(EvmClient)` - Successfully created client
    /// * `Err(anyhow::Error)` - Failed to create client
    pub fn new(node_url: &str, chain_id: u64, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: node_url.to_string(),
            chain_id,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a JSON-RPC request and returns its `result`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(T))` - The call succeeded with a result
    /// * `Ok(None)` - The call succeeded with a null result
    /// * `Err(anyhow::Error)` - Transport failure, unparseable response, or JSON-RPC error
    async fn json_rpc<T: DeserializeOwned>(&self, method: &str, params: Vec<serde_json::Value>) -> Result<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        let response: JsonRpcResponse<T> = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request to {}", method, self.base_url))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response from {}", method, self.base_url))?;

        if let Some(error) = response.error {
            return Err(anyhow::anyhow!(
                "JSON-RPC error from {} ({}): {} (code: {})",
                self.base_url,
                method,
                error.message,
                error.code
            ));
        }

        Ok(response.result)
    }

    /// Like `json_rpc`, but a null result is an error.
    async fn json_rpc_required<T: DeserializeOwned>(&self, method: &str, params: Vec<serde_json::Value>) -> Result<T> {
        self.json_rpc(method, params)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No result in {} response from {}", method, self.base_url))
    }

    /// Fetches a transaction receipt; `None` while the transaction is not yet mined.
    pub async fn get_transaction_receipt(&self, transaction_hash: &H256) -> Result<Option<TransactionReceipt>> {
        self.json_rpc(
            "eth_getTransactionReceipt",
            vec![serde_json::json!(format_hash(transaction_hash))],
        )
        .await
    }

    /// Polls for a receipt until the transaction is mined or `attempts` run out.
    ///
    /// # Returns
    ///
    /// * `Ok(TransactionReceipt)` - Mined successfully
    /// * `Err(anyhow::Error)` - Reverted, timed out, or RPC failure
    pub async fn wait_for_receipt(
        &self,
        transaction_hash: &H256,
        poll_interval: Duration,
        attempts: u32,
    ) -> Result<TransactionReceipt> {
        for _ in 0..attempts {
            if let Some(receipt) = self.get_transaction_receipt(transaction_hash).await? {
                if receipt.status.as_deref() == Some("0x0") {
                    anyhow::bail!("Transaction {} reverted", format_hash(transaction_hash));
                }
                return Ok(receipt);
            }
            tokio::time::sleep(poll_interval).await;
        }
        Err(anyhow::anyhow!(
            "Transaction {} not mined after {} attempts",
            format_hash(transaction_hash),
            attempts
        ))
    }
}

#[async_trait]
impl ChainRpc for EvmClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_proof(&self, address: &GlobalAddress, storage_keys: &[H256], block_number: U256) -> Result<RawProof> {
        let keys: Vec<String> = storage_keys.iter().map(format_hash).collect();
        self.json_rpc_required(
            "eth_getProof",
            vec![
                serde_json::json!(address.to_string()),
                serde_json::json!(keys),
                serde_json::json!(format_quantity(block_number)),
            ],
        )
        .await
        .with_context(|| format!("Failed to fetch proof for {} at block {}", address, block_number))
    }

    async fn estimate_gas(&self, call: &CallRequest) -> Result<U256> {
        let mut params = serde_json::json!({
            "from": call.from.to_string(),
            "to": call.to.to_string(),
            "data": format!("0x{}", hex::encode(&call.data)),
        });
        if let Some(gas_price) = call.gas_price {
            params["gasPrice"] = serde_json::json!(format_quantity(gas_price));
        }
        let gas: String = self.json_rpc_required("eth_estimateGas", vec![params]).await?;
        parse_u256(&gas).with_context(|| format!("Invalid eth_estimateGas result '{}'", gas))
    }

    async fn get_pending_transaction_count(&self, address: &GlobalAddress) -> Result<U256> {
        let count: String = self
            .json_rpc_required(
                "eth_getTransactionCount",
                vec![serde_json::json!(address.to_string()), serde_json::json!("pending")],
            )
            .await?;
        parse_u256(&count).with_context(|| format!("Invalid eth_getTransactionCount result '{}'", count))
    }

    async fn send_raw_transaction(&self, raw_transaction: &[u8]) -> Result<H256> {
        let hash: String = self
            .json_rpc_required(
                "eth_sendRawTransaction",
                vec![serde_json::json!(format!("0x{}", hex::encode(raw_transaction)))],
            )
            .await?;
        parse_hash(&hash).with_context(|| format!("Invalid eth_sendRawTransaction result '{}'", hash))
    }
}
