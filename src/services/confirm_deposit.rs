//! ConfirmDeposit service
//!
//! Watches the origin gateway. When its proven block on the cogateway rises, every
//! deposit declared at or below that block gets a `confirmDeposit` call on the
//! auxiliary chain, in (depositor, nonce) order.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{latest_for, prove_outbox_message};
use crate::address::GlobalAddress;
use crate::entities::{Gateway, Message, MessageType};
use crate::executor::TransactionExecutor;
use crate::gateway_calls::{self, ConfirmDepositCall};
use crate::observer::Observer;
use crate::proof::ProofGenerator;
use crate::repositories::{DepositIntentRepository, MessageRepository};

pub struct ConfirmDepositService {
    /// Origin gateway whose deposits are confirmed
    gateway_ga: GlobalAddress,
    message_repository: Arc<MessageRepository>,
    deposit_intent_repository: Arc<DepositIntentRepository>,
    /// Proofs against the origin chain
    origin_proof_generator: Arc<ProofGenerator>,
    /// Sends to the auxiliary chain
    auxiliary_executor: Arc<TransactionExecutor>,
}

impl ConfirmDepositService {
    pub fn new(
        gateway_ga: GlobalAddress,
        message_repository: Arc<MessageRepository>,
        deposit_intent_repository: Arc<DepositIntentRepository>,
        origin_proof_generator: Arc<ProofGenerator>,
        auxiliary_executor: Arc<TransactionExecutor>,
    ) -> Self {
        Self {
            gateway_ga,
            message_repository,
            deposit_intent_repository,
            origin_proof_generator,
            auxiliary_executor,
        }
    }

    /// Queues confirmations for every deposit covered by the gateway's proven block.
    ///
    /// Stops at the first proof request failure. A deposit that is not yet provable is
    /// skipped together with the later deposits of the same depositor. Deposits that
    /// already have a queued confirmation are skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of confirmations queued
    pub async fn confirm_pending(&self, gateway: &Gateway) -> Result<usize> {
        let proven_block = gateway.remote_gateway_last_proven_block_number;
        let messages = self
            .message_repository
            .get_pending_messages_by_gateway(&gateway.gateway_ga, MessageType::Deposit, proven_block)
            .await;
        if messages.is_empty() {
            debug!("No deposits of {} to confirm at block {}", gateway.gateway_ga, proven_block);
            return Ok(0);
        }

        let mut queued = 0;
        let mut deferred_senders: HashSet<GlobalAddress> = HashSet::new();
        for message in messages {
            if message.sender.map_or(false, |sender| deferred_senders.contains(&sender)) {
                debug!("confirmDeposit of {:?} waits for an earlier nonce of its sender", message.message_hash);
                continue;
            }
            if self.auxiliary_executor.has_confirmation(&message.message_hash).await {
                debug!("confirmDeposit of {:?} already queued", message.message_hash);
                continue;
            }
            let Some(call) = self.build_call(&message, gateway).await? else {
                // Later nonces of this sender would be rejected until this one is confirmed
                deferred_senders.extend(message.sender);
                continue;
            };
            let data = gateway_calls::confirm_deposit(&call);
            self.auxiliary_executor
                .add_confirmation(gateway.remote_ga, data, message.message_hash)
                .await?;
            info!(
                "Queued confirmDeposit of {:?} on {} at block {}",
                message.message_hash,
                gateway.remote_ga,
                proven_block
            );
            queued += 1;
        }
        Ok(queued)
    }

    async fn build_call(&self, message: &Message, gateway: &Gateway) -> Result<Option<ConfirmDepositCall>> {
        let (Some(depositor), Some(fee_gas_price), Some(fee_gas_limit)) =
            (message.sender, message.fee_gas_price, message.fee_gas_limit)
        else {
            warn!("Deposit {:?} is missing declaration fields, skipping", message.message_hash);
            return Ok(None);
        };
        let Some(intent) = self.deposit_intent_repository.get(&message.message_hash).await else {
            warn!("Deposit {:?} has no intent, skipping", message.message_hash);
            return Ok(None);
        };
        let (Some(value_token), Some(amount), Some(beneficiary)) =
            (intent.token_address, intent.amount, intent.beneficiary)
        else {
            warn!("Deposit intent {:?} is incomplete, skipping", message.message_hash);
            return Ok(None);
        };

        let proven_block = gateway.remote_gateway_last_proven_block_number;
        let Some(storage) = prove_outbox_message(
            &self.origin_proof_generator,
            &gateway.gateway_ga,
            message.message_hash,
            proven_block,
        )
        .await?
        else {
            return Ok(None);
        };

        Ok(Some(ConfirmDepositCall {
            value_token,
            amount,
            beneficiary,
            fee_gas_price,
            fee_gas_limit,
            depositor,
            block_number: proven_block,
            rlp_parent_nodes: storage.serialized_proof,
        }))
    }
}

#[async_trait]
impl Observer<Gateway> for ConfirmDepositService {
    fn name(&self) -> &str {
        "ConfirmDepositService"
    }

    async fn update(&self, gateways: &[Gateway]) -> Result<()> {
        if let Some(gateway) = latest_for(gateways, &self.gateway_ga) {
            self.confirm_pending(gateway).await?;
        }
        Ok(())
    }
}
