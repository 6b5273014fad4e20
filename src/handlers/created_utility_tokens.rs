//! CreatedUtilityTokens handler

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::records::{CreatedUtilityToken, CreatedUtilityTokenRecord};
use crate::entities::Erc20GatewayTokenPair;
use crate::repositories::{Erc20GatewayTokenPairRepository, GatewayRepository};

/// Records value/utility token pairs created by the cogateway.
pub struct CreatedUtilityTokensHandler {
    gateway_repository: Arc<GatewayRepository>,
    token_pair_repository: Arc<Erc20GatewayTokenPairRepository>,
}

impl CreatedUtilityTokensHandler {
    pub fn new(
        gateway_repository: Arc<GatewayRepository>,
        token_pair_repository: Arc<Erc20GatewayTokenPairRepository>,
    ) -> Self {
        Self {
            gateway_repository,
            token_pair_repository,
        }
    }

    /// Creates missing token pairs. Pairs are keyed by the value-side gateway, which is
    /// the remote of the cogateway that emitted the event.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Erc20GatewayTokenPair>)` - Newly created pairs
    pub async fn handle(&self, records: &[CreatedUtilityTokenRecord]) -> Result<Vec<Erc20GatewayTokenPair>> {
        let mut created = Vec::new();
        for record in records {
            let event = match record.parse() {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed CreatedUtilityToken record {:?}: {}", record, e);
                    continue;
                }
            };
            match self.handle_event(&event).await {
                Ok(Some(pair)) => created.push(pair),
                Ok(None) => {}
                Err(e) => warn!("Failed to store token pair for {}: {:#}", event.value_token, e),
            }
        }
        Ok(created)
    }

    async fn handle_event(&self, event: &CreatedUtilityToken) -> Result<Option<Erc20GatewayTokenPair>> {
        let Some(cogateway) = self.gateway_repository.get(&event.contract_address).await else {
            debug!("Utility token created by unmonitored gateway {}, skipping", event.contract_address);
            return Ok(None);
        };

        let gateway_ga = cogateway.remote_ga;
        if self
            .token_pair_repository
            .get_pair(&gateway_ga, &event.value_token)
            .await
            .is_some()
        {
            return Ok(None);
        }

        let pair = self
            .token_pair_repository
            .save(Erc20GatewayTokenPair::new(gateway_ga, event.value_token, event.utility_token))
            .await?;
        info!(
            "Stored token pair {} -> {} for gateway {}",
            pair.value_token,
            pair.utility_token,
            gateway_ga
        );
        Ok(Some(pair))
    }
}
