//! Cross-Chain Facilitator Library
//!
//! This crate moves deposit and withdraw messages between an origin chain and an
//! auxiliary chain. It ingests indexed contract events, keeps the off-chain model of
//! gateways, anchors and messages, and submits the proofs and confirmations that let
//! the destination gateway accept each message.

pub mod address;
pub mod api;
pub mod config;
pub mod crypto;
pub mod entities;
pub mod error;
pub mod evm_client;
pub mod executor;
pub mod facilitator;
pub mod gateway_calls;
pub mod handlers;
pub mod observer;
pub mod proof;
pub mod repositories;
pub mod seed;
pub mod services;

// Re-export commonly used types
pub use address::GlobalAddress;
pub use config::{ApiConfig, ChainConfig, Config, FacilitatorConfig, GatewayConfig};
pub use crypto::CryptoService;
pub use entities::{
    Anchor, DepositIntent, Erc20GatewayTokenPair, Gateway, GatewayType, Message, MessageStatus,
    MessageType, Transaction, WithdrawIntent,
};
pub use error::{ProofError, RecordError, RepositoryError};
pub use evm_client::{ChainRpc, EvmClient};
pub use executor::{NonceTracker, TransactionExecutor};
pub use facilitator::Facilitator;
pub use handlers::{EntityDispatcher, IndexedBatch};
pub use observer::{Observer, Subject};
pub use proof::{ProofData, ProofGenerator};
pub use repositories::Repositories;
