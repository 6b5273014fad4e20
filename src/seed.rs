//! Seed Data
//!
//! Creates the gateway pair and both anchors before the first batch is handled, so the
//! handlers can recognise monitored contracts.

use anyhow::Result;
use ethereum_types::U256;
use tracing::info;

use crate::address::GlobalAddress;
use crate::config::Config;
use crate::entities::{Anchor, Gateway, GatewayType};
use crate::repositories::Repositories;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedData {
    pub origin_gateway: GlobalAddress,
    pub auxiliary_cogateway: GlobalAddress,
    /// Anchor on the origin chain; tracks auxiliary state roots
    pub origin_anchor: GlobalAddress,
    /// Anchor on the auxiliary chain; tracks origin state roots
    pub auxiliary_anchor: GlobalAddress,
    pub gateway_type: GatewayType,
}

impl SeedData {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            origin_gateway: config.origin_gateway()?,
            auxiliary_cogateway: config.auxiliary_cogateway()?,
            origin_anchor: config.origin_anchor()?,
            auxiliary_anchor: config.auxiliary_anchor()?,
            gateway_type: config.gateway_type()?,
        })
    }

    /// Stores the gateway, cogateway and both anchors. Existing rows are kept as they are.
    ///
    /// A gateway is anchored by the anchor on the *other* chain, since that anchor
    /// records the state roots its proofs are checked against.
    pub async fn populate(&self, repositories: &Repositories) -> Result<()> {
        let gateways = [
            Gateway::new(self.origin_gateway, self.auxiliary_cogateway, self.gateway_type, self.auxiliary_anchor),
            Gateway::new(self.auxiliary_cogateway, self.origin_gateway, self.gateway_type, self.origin_anchor),
        ];
        for gateway in gateways {
            if repositories.gateway.get(&gateway.gateway_ga).await.is_none() {
                info!("Seeding gateway {} (remote {})", gateway.gateway_ga, gateway.remote_ga);
                repositories.gateway.save(gateway).await?;
            }
        }

        for anchor_ga in [self.origin_anchor, self.auxiliary_anchor] {
            if repositories.anchor.get(&anchor_ga).await.is_none() {
                info!("Seeding anchor {}", anchor_ga);
                repositories.anchor.save(Anchor::new(anchor_ga, U256::zero())).await?;
            }
        }
        Ok(())
    }
}
