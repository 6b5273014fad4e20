//! Cryptographic Operations Module
//!
//! This module holds the facilitator's secp256k1 key: it derives the facilitator's
//! Ethereum address and signs EIP-155 legacy transactions for the executors.
//!
//! ## Security Requirements
//!
//! **CRITICAL**: Private keys are loaded from environment variables and must never be
//! exposed or logged.

use anyhow::{Context, Result};
use ethereum_types::U256;
use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};
use tracing::info;

use crate::address::GlobalAddress;
use crate::config::Config;
use crate::proof::rlp;

// ============================================================================
// TRANSACTION TYPES
// ============================================================================

/// Fields of a legacy transaction before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas: U256,
    pub to: GlobalAddress,
    pub value: U256,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl UnsignedTransaction {
    /// RLP fields shared by the signing payload and the signed encoding.
    fn base_fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp::encode_u256(self.nonce),
            rlp::encode_u256(self.gas_price),
            rlp::encode_u256(self.gas),
            rlp::encode_bytes(self.to.as_bytes()),
            rlp::encode_u256(self.value),
            rlp::encode_bytes(&self.data),
        ]
    }

    /// keccak256 of rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]).
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut fields = self.base_fields();
        fields.push(rlp::encode_u64(self.chain_id));
        fields.push(rlp::encode_u64(0));
        fields.push(rlp::encode_u64(0));
        Keccak256::digest(rlp::encode_list(&fields)).into()
    }
}

// ============================================================================
// CRYPTOGRAPHIC SERVICE IMPLEMENTATION
// ============================================================================

/// Signing service for the facilitator's EVM account.
pub struct CryptoService {
    /// ECDSA signing key (secp256k1)
    signing_key: SigningKey,
}

impl CryptoService {
    /// Creates a new cryptographic service from configuration.
    ///
    /// Loads the hex-encoded private key from the environment variable named in config.
    pub fn new(config: &Config) -> Result<Self> {
        let private_key_hex = config.facilitator.get_private_key()?;
        let service = Self::from_private_key_hex(&private_key_hex)?;
        info!("Crypto service initialized with key from environment variable '{}'", config.facilitator.private_key_env);
        Ok(service)
    }

    /// Creates a service from a hex-encoded 32-byte private key.
    pub fn from_private_key_hex(private_key_hex: &str) -> Result<Self> {
        let trimmed = private_key_hex.trim();
        let clean = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(clean).context("Private key is not valid hex")?;

        if bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                bytes.len()
            ));
        }

        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| anyhow::anyhow!("Failed to create ECDSA signing key: {}", e))?;

        Ok(Self { signing_key })
    }

    /// Derives the Ethereum address: the last 20 bytes of keccak256 of the
    /// uncompressed public key without its 0x04 prefix.
    pub fn get_ethereum_address(&self) -> Result<GlobalAddress> {
        let public_key_point = self.signing_key.verifying_key().to_encoded_point(false);
        let public_key_bytes = public_key_point.as_bytes();

        if public_key_bytes.len() != 65 || public_key_bytes[0] != 0x04 {
            return Err(anyhow::anyhow!(
                "Invalid public key format: expected 65 bytes with 0x04 prefix"
            ));
        }

        let hash = Keccak256::digest(&public_key_bytes[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..32]);
        Ok(GlobalAddress::from_bytes(address))
    }

    /// Signs a 32-byte transaction hash.
    ///
    /// # Returns
    ///
    /// * `Ok((r, s, recovery_id))` - Low-s signature components and recovery id (0 or 1)
    /// * `Err(anyhow::Error)` - Signing failed
    pub fn sign_transaction_hash(&self, tx_hash: &[u8; 32]) -> Result<([u8; 32], [u8; 32], u8)> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(tx_hash)
            .map_err(|e| anyhow::anyhow!("Failed to sign transaction hash: {}", e))?;

        let sig_bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[..32]);
        s.copy_from_slice(&sig_bytes[32..64]);

        Ok((r, s, recovery_id.to_byte()))
    }

    /// Signs a legacy transaction with EIP-155 replay protection and returns the raw
    /// encoding ready for `eth_sendRawTransaction`.
    ///
    /// v = recovery_id + chain_id * 2 + 35
    pub fn sign_legacy_transaction(&self, transaction: &UnsignedTransaction) -> Result<Vec<u8>> {
        let hash = transaction.signing_hash();
        let (r, s, recovery_id) = self.sign_transaction_hash(&hash)?;

        let v = U256::from(transaction.chain_id) * U256::from(2u64) + U256::from(35u64 + u64::from(recovery_id));
        let mut fields = transaction.base_fields();
        fields.push(rlp::encode_u256(v));
        fields.push(rlp::encode_u256(U256::from_big_endian(&r)));
        fields.push(rlp::encode_u256(U256::from_big_endian(&s)));
        Ok(rlp::encode_list(&fields))
    }
}

/// Hash of a signed raw transaction.
pub fn transaction_hash(raw_transaction: &[u8]) -> [u8; 32] {
    Keccak256::digest(raw_transaction).into()
}
