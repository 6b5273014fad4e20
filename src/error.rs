//! Error Types
//!
//! Typed errors for the layers that callers need to match on. Operational code
//! (RPC, signing, orchestration) uses `anyhow` with context instead.

use ethereum_types::U256;
use thiserror::Error;

/// A field of an indexed record could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid address '{0}': expected 20 bytes of hex")]
    InvalidAddress(String),
    #[error("invalid hash '{0}': expected 32 bytes of hex")]
    InvalidHash(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Repository and observer-registry failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("observer is already attached to this subject")]
    ObserverAlreadyAttached,
    #[error("{entity} {key}: {field} must increase (stored {stored}, attempted {attempted})")]
    NonMonotonicUpdate {
        entity: &'static str,
        key: String,
        field: &'static str,
        stored: U256,
        attempted: U256,
    },
    #[error("{entity} {key}: {field} cannot move from Declared back to Undeclared")]
    StatusRegression {
        entity: &'static str,
        key: String,
        field: &'static str,
    },
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
}

/// Proof shaping failures. These indicate a malformed node from the RPC endpoint.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("RLP decoding failed: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    #[error("proof node has {0} trailing bytes after its RLP item")]
    TrailingBytes(usize),
    #[error("proof contains no nodes")]
    EmptyProof,
    #[error("expected an RLP list in the last account proof node")]
    LeafNotList,
    #[error("no storage proof returned for key {0}")]
    MissingStorageProof(String),
    #[error("invalid hex in proof node: {0}")]
    InvalidHex(String),
}
