//! ConfirmWithdraw service
//!
//! Watches the cogateway. When its proven block on the origin gateway rises, every
//! withdraw declared at or below that block gets a `confirmWithdraw` call on the
//! origin chain, in (withdrawer, nonce) order.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{latest_for, prove_outbox_message};
use crate::address::GlobalAddress;
use crate::entities::{Gateway, Message, MessageType};
use crate::executor::TransactionExecutor;
use crate::gateway_calls::{self, ConfirmWithdrawCall};
use crate::observer::Observer;
use crate::proof::ProofGenerator;
use crate::repositories::{Erc20GatewayTokenPairRepository, MessageRepository, WithdrawIntentRepository};

pub struct ConfirmWithdrawService {
    /// Cogateway whose withdraws are confirmed
    cogateway_ga: GlobalAddress,
    message_repository: Arc<MessageRepository>,
    withdraw_intent_repository: Arc<WithdrawIntentRepository>,
    token_pair_repository: Arc<Erc20GatewayTokenPairRepository>,
    /// Proofs against the auxiliary chain
    auxiliary_proof_generator: Arc<ProofGenerator>,
    /// Sends to the origin chain
    origin_executor: Arc<TransactionExecutor>,
}

impl ConfirmWithdrawService {
    pub fn new(
        cogateway_ga: GlobalAddress,
        message_repository: Arc<MessageRepository>,
        withdraw_intent_repository: Arc<WithdrawIntentRepository>,
        token_pair_repository: Arc<Erc20GatewayTokenPairRepository>,
        auxiliary_proof_generator: Arc<ProofGenerator>,
        origin_executor: Arc<TransactionExecutor>,
    ) -> Self {
        Self {
            cogateway_ga,
            message_repository,
            withdraw_intent_repository,
            token_pair_repository,
            auxiliary_proof_generator,
            origin_executor,
        }
    }

    /// Queues confirmations for every withdraw covered by the cogateway's proven block.
    ///
    /// A withdraw that cannot be confirmed yet holds back the later withdraws of the
    /// same withdrawer.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of confirmations queued
    pub async fn confirm_pending(&self, cogateway: &Gateway) -> Result<usize> {
        let proven_block = cogateway.remote_gateway_last_proven_block_number;
        let messages = self
            .message_repository
            .get_pending_messages_by_gateway(&cogateway.gateway_ga, MessageType::Withdraw, proven_block)
            .await;
        if messages.is_empty() {
            debug!("No withdraws of {} to confirm at block {}", cogateway.gateway_ga, proven_block);
            return Ok(0);
        }

        let mut queued = 0;
        let mut deferred_senders: HashSet<GlobalAddress> = HashSet::new();
        for message in messages {
            if message.sender.map_or(false, |sender| deferred_senders.contains(&sender)) {
                debug!("confirmWithdraw of {:?} waits for an earlier nonce of its sender", message.message_hash);
                continue;
            }
            if self.origin_executor.has_confirmation(&message.message_hash).await {
                debug!("confirmWithdraw of {:?} already queued", message.message_hash);
                continue;
            }
            let Some(call) = self.build_call(&message, cogateway).await? else {
                // Later nonces of this sender would be rejected until this one is confirmed
                deferred_senders.extend(message.sender);
                continue;
            };
            let data = gateway_calls::confirm_withdraw(&call);
            self.origin_executor
                .add_confirmation(cogateway.remote_ga, data, message.message_hash)
                .await?;
            info!(
                "Queued confirmWithdraw of {:?} on {} at block {}",
                message.message_hash,
                cogateway.remote_ga,
                proven_block
            );
            queued += 1;
        }
        Ok(queued)
    }

    async fn build_call(&self, message: &Message, cogateway: &Gateway) -> Result<Option<ConfirmWithdrawCall>> {
        let (Some(withdrawer), Some(fee_gas_price), Some(fee_gas_limit)) =
            (message.sender, message.fee_gas_price, message.fee_gas_limit)
        else {
            warn!("Withdraw {:?} is missing declaration fields, skipping", message.message_hash);
            return Ok(None);
        };
        let Some(intent) = self.withdraw_intent_repository.get(&message.message_hash).await else {
            warn!("Withdraw {:?} has no intent, skipping", message.message_hash);
            return Ok(None);
        };
        let (Some(utility_token), Some(amount), Some(beneficiary)) =
            (intent.token_address, intent.amount, intent.beneficiary)
        else {
            warn!("Withdraw intent {:?} is incomplete, skipping", message.message_hash);
            return Ok(None);
        };
        let Some(pair) = self
            .token_pair_repository
            .get_by_utility_token(&cogateway.remote_ga, &utility_token)
            .await
        else {
            warn!("No value token known for utility token {}, skipping {:?}", utility_token, message.message_hash);
            return Ok(None);
        };

        let proven_block = cogateway.remote_gateway_last_proven_block_number;
        let Some(storage) = prove_outbox_message(
            &self.auxiliary_proof_generator,
            &cogateway.gateway_ga,
            message.message_hash,
            proven_block,
        )
        .await?
        else {
            return Ok(None);
        };

        Ok(Some(ConfirmWithdrawCall {
            utility_token,
            value_token: pair.value_token,
            amount,
            beneficiary,
            fee_gas_price,
            fee_gas_limit,
            withdrawer,
            block_number: proven_block,
            rlp_parent_nodes: storage.serialized_proof,
        }))
    }
}

#[async_trait]
impl Observer<Gateway> for ConfirmWithdrawService {
    fn name(&self) -> &str {
        "ConfirmWithdrawService"
    }

    async fn update(&self, gateways: &[Gateway]) -> Result<()> {
        if let Some(cogateway) = latest_for(gateways, &self.cogateway_ga) {
            self.confirm_pending(cogateway).await?;
        }
        Ok(())
    }
}
