//! ConfirmDepositIntents / ConfirmWithdrawIntents handlers

use anyhow::Result;
use ethereum_types::H256;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::records::ConfirmIntentRecord;
use crate::address::GlobalAddress;
use crate::entities::{Message, MessageStatus, MessageType};
use crate::repositories::{GatewayRepository, MessageRepository};

/// Records destination-side confirmations of one message type.
pub struct ConfirmIntentsHandler {
    message_type: MessageType,
    gateway_repository: Arc<GatewayRepository>,
    message_repository: Arc<MessageRepository>,
}

impl ConfirmIntentsHandler {
    pub fn new(
        message_type: MessageType,
        gateway_repository: Arc<GatewayRepository>,
        message_repository: Arc<MessageRepository>,
    ) -> Self {
        Self {
            message_type,
            gateway_repository,
            message_repository,
        }
    }

    /// Marks each message as declared on its destination gateway, creating it when the
    /// source declaration has not been seen yet.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Message>)` - Messages whose target status moved to Declared
    pub async fn handle(&self, records: &[ConfirmIntentRecord]) -> Result<Vec<Message>> {
        let mut confirmed = Vec::new();
        for record in records {
            let (destination_ga, message_hash) = match record.parse() {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping malformed {:?} confirmation {:?}: {}", self.message_type, record, e);
                    continue;
                }
            };
            match self.confirm(&destination_ga, message_hash).await {
                Ok(Some(message)) => confirmed.push(message),
                Ok(None) => {}
                Err(e) => warn!("Failed to record confirmation of {:?}: {:#}", message_hash, e),
            }
        }
        Ok(confirmed)
    }

    async fn confirm(&self, destination_ga: &GlobalAddress, message_hash: H256) -> Result<Option<Message>> {
        let Some(gateway) = self.gateway_repository.get(destination_ga).await else {
            debug!("Confirmation on unmonitored gateway {}, skipping", destination_ga);
            return Ok(None);
        };

        let message = match self.message_repository.get(&message_hash).await {
            Some(message) if message.message_type != self.message_type => {
                warn!(
                    "Message {:?} is a {:?}, ignoring {:?} confirmation",
                    message_hash,
                    message.message_type,
                    self.message_type
                );
                return Ok(None);
            }
            Some(message) if message.target_status == MessageStatus::Declared => return Ok(None),
            Some(message) => message,
            // The source gateway is the remote of the confirming gateway.
            None => Message::new(message_hash, self.message_type, gateway.remote_ga),
        };

        let saved = self
            .message_repository
            .save(Message {
                target_status: MessageStatus::Declared,
                ..message
            })
            .await?;
        info!("{:?} message {:?} confirmed on {}", saved.message_type, message_hash, destination_ga);
        Ok(Some(saved))
    }
}
