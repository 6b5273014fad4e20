//! Entity Handlers Module
//!
//! Handlers turn batches of indexed contract events into repository writes. The
//! `EntityDispatcher` routes one indexer delivery to the handlers and then notifies
//! every repository so observers see one notification cycle per delivery.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::FacilitationAllowList;
use crate::entities::MessageType;
use crate::repositories::Repositories;

pub mod available_state_roots;
pub mod confirm_intents;
pub mod created_utility_tokens;
pub mod declared_intents;
pub mod gateway_proven;
pub mod records;

pub use available_state_roots::AvailableStateRootsHandler;
pub use confirm_intents::ConfirmIntentsHandler;
pub use created_utility_tokens::CreatedUtilityTokensHandler;
pub use declared_intents::{DeclaredDepositIntentsHandler, DeclaredIntentsHandler, DeclaredWithdrawIntentsHandler};
pub use gateway_proven::GatewayProvenHandler;
pub use records::{
    AvailableStateRootRecord, ConfirmIntentRecord, CreatedUtilityTokenRecord, DeclaredDepositIntentRecord,
    DeclaredWithdrawIntentRecord, GatewayProvenRecord,
};

// ============================================================================
// BATCH STRUCTURES
// ============================================================================

/// One delivery from the indexer. Every group is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedBatch {
    #[serde(default)]
    pub available_state_roots: Vec<AvailableStateRootRecord>,
    #[serde(default)]
    pub declared_deposit_intents: Vec<DeclaredDepositIntentRecord>,
    #[serde(default)]
    pub confirm_deposit_intents: Vec<ConfirmIntentRecord>,
    #[serde(default)]
    pub declared_withdraw_intents: Vec<DeclaredWithdrawIntentRecord>,
    #[serde(default)]
    pub confirm_withdraw_intents: Vec<ConfirmIntentRecord>,
    #[serde(default)]
    pub created_utility_tokens: Vec<CreatedUtilityTokenRecord>,
    #[serde(default)]
    pub gateway_provens: Vec<GatewayProvenRecord>,
}

impl IndexedBatch {
    pub fn is_empty(&self) -> bool {
        self.available_state_roots.is_empty()
            && self.declared_deposit_intents.is_empty()
            && self.confirm_deposit_intents.is_empty()
            && self.declared_withdraw_intents.is_empty()
            && self.confirm_withdraw_intents.is_empty()
            && self.created_utility_tokens.is_empty()
            && self.gateway_provens.is_empty()
    }
}

/// Number of entities each handler changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub anchors_raised: usize,
    pub gateways_proven: usize,
    pub token_pairs_created: usize,
    pub deposits_declared: usize,
    pub deposits_confirmed: usize,
    pub withdraws_declared: usize,
    pub withdraws_confirmed: usize,
}

// ============================================================================
// DISPATCHER
// ============================================================================

/// Routes indexed batches to the handlers.
pub struct EntityDispatcher {
    repositories: Arc<Repositories>,
    available_state_roots: AvailableStateRootsHandler,
    gateway_proven: GatewayProvenHandler,
    created_utility_tokens: CreatedUtilityTokensHandler,
    declared_deposit_intents: DeclaredDepositIntentsHandler,
    declared_withdraw_intents: DeclaredWithdrawIntentsHandler,
    confirm_deposit_intents: ConfirmIntentsHandler,
    confirm_withdraw_intents: ConfirmIntentsHandler,
    /// Batches mutate repositories one at a time; handlers read then save messages
    mutating: Mutex<()>,
}

impl EntityDispatcher {
    pub fn new(repositories: Arc<Repositories>, allow_list: FacilitationAllowList) -> Self {
        Self {
            available_state_roots: AvailableStateRootsHandler::new(repositories.anchor.clone()),
            gateway_proven: GatewayProvenHandler::new(repositories.gateway.clone()),
            created_utility_tokens: CreatedUtilityTokensHandler::new(
                repositories.gateway.clone(),
                repositories.token_pair.clone(),
            ),
            declared_deposit_intents: DeclaredIntentsHandler::for_deposits(&repositories, allow_list.clone()),
            declared_withdraw_intents: DeclaredIntentsHandler::for_withdraws(&repositories, allow_list),
            confirm_deposit_intents: ConfirmIntentsHandler::new(
                MessageType::Deposit,
                repositories.gateway.clone(),
                repositories.message.clone(),
            ),
            confirm_withdraw_intents: ConfirmIntentsHandler::new(
                MessageType::Withdraw,
                repositories.gateway.clone(),
                repositories.message.clone(),
            ),
            repositories,
            mutating: Mutex::new(()),
        }
    }

    pub fn repositories(&self) -> &Arc<Repositories> {
        &self.repositories
    }

    /// Applies one batch and notifies observers.
    ///
    /// Token pairs are stored first so that allow-list checks of deposits in the same
    /// batch see them. Gateways and anchors follow, then messages.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchReport)` - Counts of changed entities per handler
    pub async fn handle(&self, batch: &IndexedBatch) -> Result<BatchReport> {
        let report = self.apply(batch).await?;
        info!("Handled indexed batch: {:?}", report);
        self.repositories.notify_all().await;
        Ok(report)
    }

    async fn apply(&self, batch: &IndexedBatch) -> Result<BatchReport> {
        let _mutating = self.mutating.lock().await;
        let mut report = BatchReport::default();

        if !batch.created_utility_tokens.is_empty() {
            report.token_pairs_created = self.created_utility_tokens.handle(&batch.created_utility_tokens).await?.len();
        }
        if !batch.gateway_provens.is_empty() {
            report.gateways_proven = self.gateway_proven.handle(&batch.gateway_provens).await?.len();
        }
        if !batch.available_state_roots.is_empty() {
            report.anchors_raised = self.available_state_roots.handle(&batch.available_state_roots).await?.len();
        }
        if !batch.declared_deposit_intents.is_empty() {
            report.deposits_declared = self
                .declared_deposit_intents
                .handle(&batch.declared_deposit_intents)
                .await?
                .len();
        }
        if !batch.declared_withdraw_intents.is_empty() {
            report.withdraws_declared = self
                .declared_withdraw_intents
                .handle(&batch.declared_withdraw_intents)
                .await?
                .len();
        }
        if !batch.confirm_deposit_intents.is_empty() {
            report.deposits_confirmed = self
                .confirm_deposit_intents
                .handle(&batch.confirm_deposit_intents)
                .await?
                .len();
        }
        if !batch.confirm_withdraw_intents.is_empty() {
            report.withdraws_confirmed = self
                .confirm_withdraw_intents
                .handle(&batch.confirm_withdraw_intents)
                .await?
                .len();
        }
        Ok(report)
    }
}
