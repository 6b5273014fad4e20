//! Repository Module
//!
//! Keyed storage for every entity, with the typed queries the handlers and services
//! need. Storage is in memory; each repository is also the `Subject` its observers
//! attach to.

use std::sync::Arc;

pub mod gateway;
pub mod message;
pub mod store;
pub mod transaction;

pub use gateway::{AnchorRepository, GatewayRepository};
pub use message::{
    DepositIntentRepository, Erc20GatewayTokenPairRepository, MessageRepository,
    WithdrawIntentRepository,
};
pub use store::Repository;
pub use transaction::TransactionRepository;

/// The full set of repositories shared by handlers, services and executors.
#[derive(Default)]
pub struct Repositories {
    pub gateway: Arc<GatewayRepository>,
    pub anchor: Arc<AnchorRepository>,
    pub message: Arc<MessageRepository>,
    pub deposit_intent: Arc<DepositIntentRepository>,
    pub withdraw_intent: Arc<WithdrawIntentRepository>,
    pub token_pair: Arc<Erc20GatewayTokenPairRepository>,
    pub transaction: Arc<TransactionRepository>,
}

impl Repositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies the observers of every repository.
    ///
    /// Gateways are notified before anchors so that confirmations against an already
    /// proven height are queued ahead of the next gateway proof.
    pub async fn notify_all(&self) {
        self.token_pair.notify().await;
        self.deposit_intent.notify().await;
        self.withdraw_intent.notify().await;
        self.message.notify().await;
        self.gateway.notify().await;
        self.anchor.notify().await;
        self.transaction.notify().await;
    }
}
