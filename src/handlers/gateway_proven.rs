//! GatewayProven handler

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use super::records::{GatewayProven, GatewayProvenRecord};
use crate::entities::Gateway;
use crate::repositories::GatewayRepository;

/// Records the block height at which a gateway's remote counterpart was proven.
pub struct GatewayProvenHandler {
    gateway_repository: Arc<GatewayRepository>,
}

impl GatewayProvenHandler {
    pub fn new(gateway_repository: Arc<GatewayRepository>) -> Self {
        Self { gateway_repository }
    }

    /// Raises `remoteGatewayLastProvenBlockNumber` of each proven gateway.
    ///
    /// The proven gateway is `remoteGateway`; its record must point back at the
    /// contract that accepted the proof. Unknown gateways are logged and skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Gateway>)` - Gateways that were raised
    pub async fn handle(&self, records: &[GatewayProvenRecord]) -> Result<Vec<Gateway>> {
        let mut raised = Vec::new();
        for record in records {
            let event = match record.parse() {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed GatewayProven record {:?}: {}", record, e);
                    continue;
                }
            };
            if let Some(gateway) = self.handle_event(&event).await {
                raised.push(gateway);
            }
        }
        Ok(raised)
    }

    async fn handle_event(&self, event: &GatewayProven) -> Option<Gateway> {
        let Some(gateway) = self.gateway_repository.get(&event.remote_gateway).await else {
            info!("GatewayProven for unknown gateway {}, skipping", event.remote_gateway);
            return None;
        };
        if gateway.remote_ga != event.contract_address {
            warn!(
                "GatewayProven from {} does not match remote {} of gateway {}, skipping",
                event.contract_address,
                gateway.remote_ga,
                gateway.gateway_ga
            );
            return None;
        }

        match self
            .gateway_repository
            .raise_remote_gateway_last_proven_block_number(&event.remote_gateway, event.block_number)
            .await
        {
            Ok(Some(updated)) => {
                info!(
                    "Gateway {} proven on {} at block {}",
                    updated.gateway_ga,
                    event.contract_address,
                    event.block_number
                );
                Some(updated)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to raise proven block of gateway {}: {}", event.remote_gateway, e);
                None
            }
        }
    }
}
