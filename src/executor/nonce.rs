//! Nonce tracking
//!
//! The first assignment is seeded from the account's pending transaction count; later
//! assignments increment locally. The tracker assumes it is the only sender for the
//! account.

use anyhow::{Context, Result};
use ethereum_types::U256;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::address::GlobalAddress;
use crate::evm_client::ChainRpc;

pub struct NonceTracker {
    rpc: Arc<dyn ChainRpc>,
    address: GlobalAddress,
    /// Next nonce to hand out; `None` until seeded
    next: Mutex<Option<U256>>,
}

impl NonceTracker {
    pub fn new(rpc: Arc<dyn ChainRpc>, address: GlobalAddress) -> Self {
        Self {
            rpc,
            address,
            next: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &GlobalAddress {
        &self.address
    }

    /// Assigns the next nonce.
    pub async fn next_nonce(&self) -> Result<U256> {
        let mut next = self.next.lock().await;
        let nonce = match *next {
            Some(nonce) => nonce,
            None => {
                let pending = self
                    .rpc
                    .get_pending_transaction_count(&self.address)
                    .await
                    .with_context(|| format!("Failed to seed nonce for {}", self.address))?;
                debug!("Seeded nonce for {} from pending count {}", self.address, pending);
                pending
            }
        };
        *next = Some(nonce + U256::one());
        Ok(nonce)
    }

    /// Returns an assigned nonce that was never broadcast, if it is the latest one.
    pub async fn release(&self, nonce: U256) {
        let mut next = self.next.lock().await;
        if *next == Some(nonce + U256::one()) {
            *next = Some(nonce);
        }
    }
}
