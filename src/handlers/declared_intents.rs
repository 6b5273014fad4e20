//! DeclaredDepositIntents / DeclaredWithdrawIntents handlers

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::records::{DeclaredDepositIntentRecord, DeclaredIntent, DeclaredWithdrawIntentRecord};
use crate::config::FacilitationAllowList;
use crate::entities::{DepositIntent, Intent, Message, MessageStatus, MessageType, WithdrawIntent};
use crate::error::RecordError;
use crate::repositories::{
    Erc20GatewayTokenPairRepository, GatewayRepository, MessageRepository, Repositories, Repository,
};

/// An indexed record announcing a message declared on its source gateway.
pub trait DeclaredRecord: std::fmt::Debug {
    fn parse(&self) -> Result<DeclaredIntent, RecordError>;
}

impl DeclaredRecord for DeclaredDepositIntentRecord {
    fn parse(&self) -> Result<DeclaredIntent, RecordError> {
        DeclaredDepositIntentRecord::parse(self)
    }
}

impl DeclaredRecord for DeclaredWithdrawIntentRecord {
    fn parse(&self) -> Result<DeclaredIntent, RecordError> {
        DeclaredWithdrawIntentRecord::parse(self)
    }
}

/// Records source-side declarations of one message type.
pub struct DeclaredIntentsHandler<I: Intent> {
    message_type: MessageType,
    gateway_repository: Arc<GatewayRepository>,
    message_repository: Arc<MessageRepository>,
    intent_repository: Arc<Repository<I>>,
    token_pair_repository: Arc<Erc20GatewayTokenPairRepository>,
    allow_list: FacilitationAllowList,
}

pub type DeclaredDepositIntentsHandler = DeclaredIntentsHandler<DepositIntent>;
pub type DeclaredWithdrawIntentsHandler = DeclaredIntentsHandler<WithdrawIntent>;

impl DeclaredIntentsHandler<DepositIntent> {
    pub fn for_deposits(repositories: &Repositories, allow_list: FacilitationAllowList) -> Self {
        Self::new(MessageType::Deposit, repositories, repositories.deposit_intent.clone(), allow_list)
    }
}

impl DeclaredIntentsHandler<WithdrawIntent> {
    pub fn for_withdraws(repositories: &Repositories, allow_list: FacilitationAllowList) -> Self {
        Self::new(MessageType::Withdraw, repositories, repositories.withdraw_intent.clone(), allow_list)
    }
}

impl<I: Intent> DeclaredIntentsHandler<I> {
    fn new(
        message_type: MessageType,
        repositories: &Repositories,
        intent_repository: Arc<Repository<I>>,
        allow_list: FacilitationAllowList,
    ) -> Self {
        Self {
            message_type,
            gateway_repository: repositories.gateway.clone(),
            message_repository: repositories.message.clone(),
            intent_repository,
            token_pair_repository: repositories.token_pair.clone(),
            allow_list,
        }
    }

    /// Applies each declaration independently; a failing record is logged and skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Message>)` - Messages whose source status moved to Declared
    pub async fn handle<R: DeclaredRecord>(&self, records: &[R]) -> Result<Vec<Message>> {
        let mut declared = Vec::new();
        for record in records {
            let intent = match record.parse() {
                Ok(intent) => intent,
                Err(e) => {
                    warn!("Skipping malformed {:?} declaration {:?}: {}", self.message_type, record, e);
                    continue;
                }
            };
            match self.handle_intent(&intent).await {
                Ok(Some(message)) => declared.push(message),
                Ok(None) => {}
                Err(e) => warn!("Failed to record declared message {:?}: {:#}", intent.message_hash, e),
            }
        }
        Ok(declared)
    }

    async fn handle_intent(&self, intent: &DeclaredIntent) -> Result<Option<Message>> {
        let existing = self.message_repository.get(&intent.message_hash).await;
        match &existing {
            Some(message) if message.message_type != self.message_type => {
                warn!(
                    "Message {:?} is a {:?}, ignoring {:?} declaration",
                    intent.message_hash,
                    message.message_type,
                    self.message_type
                );
                return Ok(None);
            }
            Some(_) => {}
            None => {
                if self.gateway_repository.get(&intent.contract_address).await.is_none() {
                    debug!(
                        "Message {:?} declared on unmonitored gateway {}, skipping",
                        intent.message_hash,
                        intent.contract_address
                    );
                    return Ok(None);
                }
            }
        }

        if !self.is_facilitated(intent).await {
            info!("Token {} is not facilitated, dropping message {:?}", intent.token, intent.message_hash);
            return Ok(None);
        }

        let declared = match existing {
            Some(message) if message.source_status == MessageStatus::Declared => None,
            Some(message) => Some(self.declare(message, intent).await?),
            None => {
                let message = Message::new(intent.message_hash, self.message_type, intent.contract_address);
                Some(self.declare(message, intent).await?)
            }
        };

        match self.intent_repository.get(&intent.message_hash).await {
            None => {
                self.intent_repository
                    .save(I::create(intent.message_hash, intent.token, intent.amount, intent.beneficiary))
                    .await?;
            }
            Some(mut stored) => {
                if stored.fill_missing(intent.token, intent.amount, intent.beneficiary) {
                    self.intent_repository.save(stored).await?;
                }
            }
        }

        Ok(declared)
    }

    async fn declare(&self, mut message: Message, intent: &DeclaredIntent) -> Result<Message> {
        message.source_status = MessageStatus::Declared;
        message.sender = Some(intent.sender);
        message.nonce = Some(intent.nonce);
        message.fee_gas_price = Some(intent.fee_gas_price);
        message.fee_gas_limit = Some(intent.fee_gas_limit);
        message.source_declaration_block_number = Some(intent.block_number);
        let saved = self.message_repository.save(message).await?;
        info!(
            "{:?} message {:?} declared on {} at block {}",
            saved.message_type,
            saved.message_hash,
            saved.gateway_address,
            intent.block_number
        );
        Ok(saved)
    }

    /// Deposits are checked by the utility token of their pair, or by the value token
    /// when no pair is known yet. Withdraws carry the utility token directly.
    async fn is_facilitated(&self, intent: &DeclaredIntent) -> bool {
        let token = match self.message_type {
            MessageType::Deposit => self
                .token_pair_repository
                .get_pair(&intent.contract_address, &intent.token)
                .await
                .map(|pair| pair.utility_token)
                .unwrap_or(intent.token),
            MessageType::Withdraw => intent.token,
        };
        self.allow_list.permits(&token)
    }
}
