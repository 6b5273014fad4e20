//! Message, intent and token pair queries

use ethereum_types::U256;

use super::Repository;
use crate::address::GlobalAddress;
use crate::entities::{DepositIntent, Erc20GatewayTokenPair, Message, MessageType, WithdrawIntent};

pub type MessageRepository = Repository<Message>;
pub type DepositIntentRepository = Repository<DepositIntent>;
pub type WithdrawIntentRepository = Repository<WithdrawIntent>;
pub type Erc20GatewayTokenPairRepository = Repository<Erc20GatewayTokenPair>;

impl Repository<Message> {
    /// Messages of any type from `gateway` that are declared at the source no later
    /// than `proven_height` and still undeclared at the target.
    ///
    /// Ordered by (sender, nonce) so that confirmations for one sender are submitted in
    /// nonce order.
    pub async fn get_messages_for_confirmation(
        &self,
        gateway: &GlobalAddress,
        proven_height: U256,
    ) -> Vec<Message> {
        let mut messages = self
            .find(|m| m.gateway_address == *gateway && m.is_pending_at(proven_height))
            .await;
        sort_by_sender_nonce(&mut messages);
        messages
    }

    /// Same as `get_messages_for_confirmation`, restricted to one message type.
    pub async fn get_pending_messages_by_gateway(
        &self,
        gateway: &GlobalAddress,
        message_type: MessageType,
        proven_height: U256,
    ) -> Vec<Message> {
        let mut messages = self
            .find(|m| {
                m.gateway_address == *gateway
                    && m.message_type == message_type
                    && m.is_pending_at(proven_height)
            })
            .await;
        sort_by_sender_nonce(&mut messages);
        messages
    }
}

fn sort_by_sender_nonce(messages: &mut [Message]) {
    messages.sort_by(|a, b| (a.sender, a.nonce).cmp(&(b.sender, b.nonce)));
}

impl Repository<Erc20GatewayTokenPair> {
    pub async fn get_pair(
        &self,
        gateway_ga: &GlobalAddress,
        value_token: &GlobalAddress,
    ) -> Option<Erc20GatewayTokenPair> {
        self.get(&(*gateway_ga, *value_token)).await
    }

    /// Reverse lookup from a utility token to its pair.
    pub async fn get_by_utility_token(
        &self,
        gateway_ga: &GlobalAddress,
        utility_token: &GlobalAddress,
    ) -> Option<Erc20GatewayTokenPair> {
        self.find(|p| p.gateway_ga == *gateway_ga && p.utility_token == *utility_token)
            .await
            .into_iter()
            .next()
    }
}
