//! Message entity

use chrono::{DateTime, Utc};
use ethereum_types::{H256, U256};

use super::Entity;
use crate::address::GlobalAddress;
use crate::error::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Deposit,
    Withdraw,
}

/// Declaration state of a message on one side of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageStatus {
    Undeclared,
    Declared,
}

/// A cross-chain message identified by its hash.
///
/// `gateway_address` is always the source gateway. The sender, fee, nonce and
/// declaration block are only known once the source side declaration has been seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_hash: H256,
    pub message_type: MessageType,
    pub source_status: MessageStatus,
    pub target_status: MessageStatus,
    pub gateway_address: GlobalAddress,
    pub sender: Option<GlobalAddress>,
    pub nonce: Option<U256>,
    pub fee_gas_price: Option<U256>,
    pub fee_gas_limit: Option<U256>,
    pub source_declaration_block_number: Option<U256>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// A message whose source-side declaration has not been seen yet.
    pub fn new(message_hash: H256, message_type: MessageType, gateway_address: GlobalAddress) -> Self {
        let now = Utc::now();
        Self {
            message_hash,
            message_type,
            source_status: MessageStatus::Undeclared,
            target_status: MessageStatus::Undeclared,
            gateway_address,
            sender: None,
            nonce: None,
            fee_gas_price: None,
            fee_gas_limit: None,
            source_declaration_block_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Declared at the source no later than `proven_height` and not yet declared at
    /// the target.
    pub fn is_pending_at(&self, proven_height: U256) -> bool {
        self.source_status == MessageStatus::Declared
            && self.target_status == MessageStatus::Undeclared
            && self
                .source_declaration_block_number
                .map_or(false, |block| block <= proven_height)
    }
}

impl Entity for Message {
    type Key = H256;
    const NAME: &'static str = "Message";

    fn key(&self) -> H256 {
        self.message_hash
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    /// Source and target status only move from Undeclared to Declared.
    fn validate_update(&self, stored: &Self) -> Result<(), RepositoryError> {
        let regressed = [
            ("sourceStatus", stored.source_status, self.source_status),
            ("targetStatus", stored.target_status, self.target_status),
        ]
        .into_iter()
        .find(|(_, before, after)| *before == MessageStatus::Declared && *after == MessageStatus::Undeclared);

        match regressed {
            Some((field, _, _)) => Err(RepositoryError::StatusRegression {
                entity: Self::NAME,
                key: format!("{:?}", self.message_hash),
                field,
            }),
            None => Ok(()),
        }
    }
}
