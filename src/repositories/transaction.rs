//! Transaction queue storage

use ethereum_types::H256;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Repository;
use crate::address::GlobalAddress;
use crate::entities::{Entity, Transaction};
use crate::error::RepositoryError;

/// Stores queued transactions with insertion-ordered ids.
pub struct TransactionRepository {
    rows: Repository<Transaction>,
    sequence: AtomicU64,
}

impl TransactionRepository {
    pub fn new() -> Self {
        Self {
            rows: Repository::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Stores a new transaction under the next id.
    pub async fn create(&self, mut transaction: Transaction) -> Result<Transaction, RepositoryError> {
        transaction.id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows.save(transaction).await
    }

    /// Overwrites an existing transaction.
    pub async fn update(&self, transaction: Transaction) -> Result<Transaction, RepositoryError> {
        if self.rows.get(&transaction.id).await.is_none() {
            return Err(RepositoryError::NotFound {
                entity: Transaction::NAME,
                key: transaction.id.to_string(),
            });
        }
        self.rows.save(transaction).await
    }

    pub async fn get(&self, id: u64) -> Option<Transaction> {
        self.rows.get(&id).await
    }

    /// Oldest pending transaction from `from_address` on `chain_id`.
    pub async fn dequeue(&self, chain_id: u64, from_address: &GlobalAddress) -> Option<Transaction> {
        self.rows
            .find(|t| t.is_pending() && t.chain_id == chain_id && t.from_address == *from_address)
            .await
            .into_iter()
            .min_by_key(|t| t.id)
    }

    /// Finds a stored transaction carrying exactly this call.
    pub async fn find_call(
        &self,
        chain_id: u64,
        from_address: &GlobalAddress,
        to_address: &GlobalAddress,
        encoded_data: &[u8],
    ) -> Option<Transaction> {
        self.rows
            .find(|t| {
                t.chain_id == chain_id
                    && t.from_address == *from_address
                    && t.to_address == *to_address
                    && t.encoded_data == encoded_data
            })
            .await
            .into_iter()
            .min_by_key(|t| t.id)
    }

    /// Finds the stored transaction confirming `message_hash`.
    pub async fn find_for_message(
        &self,
        chain_id: u64,
        from_address: &GlobalAddress,
        message_hash: &H256,
    ) -> Option<Transaction> {
        self.rows
            .find(|t| {
                t.chain_id == chain_id && t.from_address == *from_address && t.message_hash.as_ref() == Some(message_hash)
            })
            .await
            .into_iter()
            .min_by_key(|t| t.id)
    }

    /// All transactions in insertion order.
    pub async fn all(&self) -> Vec<Transaction> {
        let mut transactions = self.rows.all().await;
        transactions.sort_by_key(|t| t.id);
        transactions
    }

    pub async fn notify(&self) {
        self.rows.notify().await
    }
}

impl Default for TransactionRepository {
    fn default() -> Self {
        Self::new()
    }
}
