//! Transaction Executor Module
//!
//! One executor per chain. Services queue contract calls with `add`; a polling loop
//! takes the oldest pending call, estimates gas, assigns a nonce, signs and broadcasts
//! it, and stamps the stored record with the resulting hash.

use anyhow::{Context, Result};
use ethereum_types::{H256, U256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::address::{format_hash, GlobalAddress};
use crate::crypto::{CryptoService, UnsignedTransaction};
use crate::entities::Transaction;
use crate::evm_client::{CallRequest, ChainRpc};
use crate::repositories::TransactionRepository;

pub mod nonce;

pub use nonce::NonceTracker;

// ============================================================================
// EXECUTOR IMPLEMENTATION
// ============================================================================

/// Sends queued transactions for one account on one chain.
pub struct TransactionExecutor {
    transaction_repository: Arc<TransactionRepository>,
    rpc: Arc<dyn ChainRpc>,
    crypto_service: Arc<CryptoService>,
    nonce_tracker: NonceTracker,
    from_address: GlobalAddress,
    gas_price: U256,
    polling_interval: Duration,
    /// Serializes dequeue-send-update so a record is never sent twice
    tick_lock: Mutex<()>,
    shutdown: watch::Sender<bool>,
}

impl TransactionExecutor {
    /// Creates an executor.
    ///
    /// # Arguments
    ///
    /// * `transaction_repository` - Queue of transactions, shared across executors
    /// * `rpc` - Chain the transactions are sent to
    /// * `crypto_service` - Signing key; its address is the sender
    /// * `gas_price` - Gas price stamped on every queued transaction
    /// * `polling_interval` - Delay between queue polls
    pub fn new(
        transaction_repository: Arc<TransactionRepository>,
        rpc: Arc<dyn ChainRpc>,
        crypto_service: Arc<CryptoService>,
        gas_price: U256,
        polling_interval: Duration,
    ) -> Result<Self> {
        let from_address = crypto_service.get_ethereum_address()?;
        let nonce_tracker = NonceTracker::new(rpc.clone(), from_address);
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            transaction_repository,
            rpc,
            crypto_service,
            nonce_tracker,
            from_address,
            gas_price,
            polling_interval,
            tick_lock: Mutex::new(()),
            shutdown,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.rpc.chain_id()
    }

    pub fn from_address(&self) -> &GlobalAddress {
        &self.from_address
    }

    /// Queues a contract call.
    ///
    /// # Returns
    ///
    /// * `Ok(Transaction)` - The stored pending transaction
    /// * `Err(anyhow::Error)` - The record could not be stored
    pub async fn add(&self, to_address: GlobalAddress, encoded_data: Vec<u8>) -> Result<Transaction> {
        self.enqueue(self.new_transaction(to_address, encoded_data)).await
    }

    /// Queues a call that confirms `message_hash` on this chain.
    pub async fn add_confirmation(
        &self,
        to_address: GlobalAddress,
        encoded_data: Vec<u8>,
        message_hash: H256,
    ) -> Result<Transaction> {
        self.enqueue(self.new_transaction(to_address, encoded_data).for_message(message_hash))
            .await
    }

    fn new_transaction(&self, to_address: GlobalAddress, encoded_data: Vec<u8>) -> Transaction {
        Transaction::new(
            self.chain_id(),
            self.from_address,
            to_address,
            encoded_data,
            self.gas_price,
        )
    }

    async fn enqueue(&self, transaction: Transaction) -> Result<Transaction> {
        let saved = self
            .transaction_repository
            .create(transaction)
            .await
            .context("Failed to queue transaction")?;
        info!(
            "Queued transaction {} to {} on chain {}",
            saved.id,
            saved.to_address,
            saved.chain_id
        );
        Ok(saved)
    }

    /// Whether a confirmation of `message_hash` has already been stored by this executor.
    pub async fn has_confirmation(&self, message_hash: &H256) -> bool {
        self.transaction_repository
            .find_for_message(self.chain_id(), &self.from_address, message_hash)
            .await
            .is_some()
    }

    /// Whether this executor has already stored exactly this call.
    pub async fn has_queued(&self, to_address: &GlobalAddress, encoded_data: &[u8]) -> bool {
        self.transaction_repository
            .find_call(self.chain_id(), &self.from_address, to_address, encoded_data)
            .await
            .is_some()
    }

    /// Sends the oldest pending transaction, if any.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Transaction))` - A transaction was broadcast and stamped
    /// * `Ok(None)` - Nothing was pending
    /// * `Err(anyhow::Error)` - Estimation, signing or broadcast failed; the record stays pending
    pub async fn execute_next(&self) -> Result<Option<Transaction>> {
        let _guard = self.tick_lock.lock().await;

        let Some(mut transaction) = self
            .transaction_repository
            .dequeue(self.chain_id(), &self.from_address)
            .await
        else {
            return Ok(None);
        };

        let gas = match transaction.gas {
            Some(gas) => gas,
            None => self
                .rpc
                .estimate_gas(&CallRequest {
                    from: self.from_address,
                    to: transaction.to_address,
                    data: transaction.encoded_data.clone(),
                    gas_price: Some(transaction.gas_price),
                })
                .await
                .with_context(|| format!("Failed to estimate gas for transaction {}", transaction.id))?,
        };

        let nonce = self.nonce_tracker.next_nonce().await?;
        let raw = self.crypto_service.sign_legacy_transaction(&UnsignedTransaction {
            nonce,
            gas_price: transaction.gas_price,
            gas,
            to: transaction.to_address,
            value: U256::zero(),
            data: transaction.encoded_data.clone(),
            chain_id: transaction.chain_id,
        })?;

        let hash = match self.rpc.send_raw_transaction(&raw).await {
            Ok(hash) => hash,
            Err(e) => {
                self.nonce_tracker.release(nonce).await;
                return Err(e.context(format!("Failed to send transaction {}", transaction.id)));
            }
        };

        transaction.gas = Some(gas);
        transaction.nonce = Some(nonce);
        transaction.transaction_hash = Some(hash);
        let saved = self.transaction_repository.update(transaction).await?;
        info!(
            "Sent transaction {} on chain {} with nonce {}: {}",
            saved.id,
            saved.chain_id,
            nonce,
            format_hash(&hash)
        );
        Ok(Some(saved))
    }

    /// Starts the polling loop.
    ///
    /// The first poll happens immediately. `stop` ends the loop after the poll in
    /// progress completes.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let executor = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            info!("Transaction executor started for chain {}", executor.chain_id());
            let mut interval = tokio::time::interval(executor.polling_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                let stopped = *shutdown.borrow();
                if stopped {
                    break;
                }
                tokio::select! {
                    _ = interval.tick() => {
                        match executor.execute_next().await {
                            Ok(Some(_)) => {}
                            Ok(None) => debug!("No pending transactions on chain {}", executor.chain_id()),
                            Err(e) => error!("Transaction executor error on chain {}: {:#}", executor.chain_id(), e),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            warn!("Shutdown channel closed for executor on chain {}", executor.chain_id());
                        }
                        break;
                    }
                }
            }
            info!("Transaction executor stopped for chain {}", executor.chain_id());
        })
    }

    /// Signals the polling loop to stop.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}
