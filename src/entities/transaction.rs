//! Outbound transaction entity

use chrono::{DateTime, Utc};
use ethereum_types::{H256, U256};

use super::Entity;
use crate::address::GlobalAddress;

/// A queued contract call. It is pending until `transaction_hash` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Insertion-ordered id, assigned by the repository on creation
    pub id: u64,
    pub chain_id: u64,
    pub from_address: GlobalAddress,
    pub to_address: GlobalAddress,
    pub encoded_data: Vec<u8>,
    pub gas_price: U256,
    pub gas: Option<U256>,
    pub nonce: Option<U256>,
    pub transaction_hash: Option<H256>,
    /// Message this call confirms, for confirmation calls
    pub message_hash: Option<H256>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        chain_id: u64,
        from_address: GlobalAddress,
        to_address: GlobalAddress,
        encoded_data: Vec<u8>,
        gas_price: U256,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            chain_id,
            from_address,
            to_address,
            encoded_data,
            gas_price,
            gas: None,
            nonce: None,
            transaction_hash: None,
            message_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Tags the call with the message it confirms.
    pub fn for_message(mut self, message_hash: H256) -> Self {
        self.message_hash = Some(message_hash);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.transaction_hash.is_none()
    }
}

impl Entity for Transaction {
    type Key = u64;
    const NAME: &'static str = "Transaction";

    fn key(&self) -> u64 {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }
}
