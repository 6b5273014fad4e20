//! ProveGateway service
//!
//! Watches both anchors. When an anchor reaches a new height and the gateway it tracks
//! has messages waiting at that height, the source gateway's account is proven on the
//! destination gateway with `proveGateway`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethereum_types::U256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::address::GlobalAddress;
use crate::entities::{Anchor, Gateway, MessageType};
use crate::executor::TransactionExecutor;
use crate::gateway_calls;
use crate::observer::Observer;
use crate::proof::ProofGenerator;
use crate::repositories::{GatewayRepository, MessageRepository};

/// Proof source and transaction sink for one chain.
pub struct ChainEndpoints {
    pub proof_generator: Arc<ProofGenerator>,
    pub executor: Arc<TransactionExecutor>,
}

pub struct ProveGatewayService {
    gateway_repository: Arc<GatewayRepository>,
    message_repository: Arc<MessageRepository>,
    origin: ChainEndpoints,
    auxiliary: ChainEndpoints,
}

impl ProveGatewayService {
    pub fn new(
        gateway_repository: Arc<GatewayRepository>,
        message_repository: Arc<MessageRepository>,
        origin: ChainEndpoints,
        auxiliary: ChainEndpoints,
    ) -> Self {
        Self {
            gateway_repository,
            message_repository,
            origin,
            auxiliary,
        }
    }

    /// Proves the gateway tracked by `anchor` at the anchored height if messages are
    /// waiting for it.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A `proveGateway` call was queued
    /// * `Ok(false)` - Nothing to prove
    /// * `Err(anyhow::Error)` - The proof request failed; nothing was queued
    pub async fn prove(&self, anchor: &Anchor) -> Result<bool> {
        let Some(gateway) = self.gateway_repository.get_by_anchor(&anchor.anchor_ga).await else {
            debug!("No gateway tracked by anchor {}", anchor.anchor_ga);
            return Ok(false);
        };
        let height = anchor.last_anchored_block_number;
        if height <= gateway.remote_gateway_last_proven_block_number {
            debug!("Gateway {} already proven at block {} or later", gateway.gateway_ga, height);
            return Ok(false);
        }

        let pending = self
            .message_repository
            .get_messages_for_confirmation(&gateway.gateway_ga, height)
            .await;
        let Some(first) = pending.first() else {
            info!("No messages of {} pending at block {}, skipping proveGateway", gateway.gateway_ga, height);
            return Ok(false);
        };

        // Deposits originate on the origin chain and are proven on the auxiliary chain.
        let (source, destination) = match first.message_type {
            MessageType::Deposit => (&self.origin, &self.auxiliary),
            MessageType::Withdraw => (&self.auxiliary, &self.origin),
        };
        self.submit(&gateway, source, destination, height).await
    }

    async fn submit(
        &self,
        gateway: &Gateway,
        source: &ChainEndpoints,
        destination: &ChainEndpoints,
        height: U256,
    ) -> Result<bool> {
        let proof = source
            .proof_generator
            .get_outbox_proof(&gateway.gateway_ga, &[], height)
            .await
            .with_context(|| format!("Failed to prove gateway {} at block {}", gateway.gateway_ga, height))?;

        let data = gateway_calls::prove_gateway(
            height,
            &proof.encoded_account_value_bytes()?,
            &proof.serialized_account_proof,
        );
        if destination.executor.has_queued(&gateway.remote_ga, &data).await {
            debug!("proveGateway of {} at block {} already queued", gateway.gateway_ga, height);
            return Ok(false);
        }
        destination.executor.add(gateway.remote_ga, data).await?;
        info!("Queued proveGateway of {} on {} at block {}", gateway.gateway_ga, gateway.remote_ga, height);
        Ok(true)
    }
}

#[async_trait]
impl Observer<Anchor> for ProveGatewayService {
    fn name(&self) -> &str {
        "ProveGatewayService"
    }

    /// Proves once per anchor in the batch, at that anchor's highest height.
    async fn update(&self, anchors: &[Anchor]) -> Result<()> {
        let mut latest: HashMap<GlobalAddress, &Anchor> = HashMap::new();
        for anchor in anchors {
            let entry = latest.entry(anchor.anchor_ga).or_insert(anchor);
            if anchor.last_anchored_block_number > entry.last_anchored_block_number {
                *entry = anchor;
            }
        }

        let mut first_error = None;
        for anchor in latest.into_values() {
            if let Err(e) = self.prove(anchor).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
