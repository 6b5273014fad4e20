//! Gateway entity

use chrono::{DateTime, Utc};
use ethereum_types::U256;
use std::fmt;
use std::str::FromStr;

use super::Entity;
use crate::address::GlobalAddress;
use crate::error::RepositoryError;

/// Kind of value a gateway moves across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayType {
    Consensus,
    Most,
    Erc20,
    Nft,
}

impl FromStr for GatewayType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "consensus" => Ok(GatewayType::Consensus),
            "most" => Ok(GatewayType::Most),
            "erc20" => Ok(GatewayType::Erc20),
            "nft" => Ok(GatewayType::Nft),
            other => Err(anyhow::anyhow!("Unknown gateway type '{}'", other)),
        }
    }
}

impl fmt::Display for GatewayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GatewayType::Consensus => "CONSENSUS",
            GatewayType::Most => "MOST",
            GatewayType::Erc20 => "ERC20",
            GatewayType::Nft => "NFT",
        };
        f.write_str(name)
    }
}

/// A gateway contract on one chain, paired with its counterpart on the other chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub gateway_ga: GlobalAddress,
    /// Counterpart gateway on the other chain
    pub remote_ga: GlobalAddress,
    pub gateway_type: GatewayType,
    /// Anchor on the remote chain that records this gateway's chain state roots
    pub anchor_ga: GlobalAddress,
    pub destination_ga: Option<GlobalAddress>,
    /// Highest block of the remote gateway's chain proven into this gateway
    pub remote_gateway_last_proven_block_number: U256,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gateway {
    pub fn new(
        gateway_ga: GlobalAddress,
        remote_ga: GlobalAddress,
        gateway_type: GatewayType,
        anchor_ga: GlobalAddress,
    ) -> Self {
        let now = Utc::now();
        Self {
            gateway_ga,
            remote_ga,
            gateway_type,
            anchor_ga,
            destination_ga: None,
            remote_gateway_last_proven_block_number: U256::zero(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Gateway {
    type Key = GlobalAddress;
    const NAME: &'static str = "Gateway";

    fn key(&self) -> GlobalAddress {
        self.gateway_ga
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    /// The proven block number may never move backwards.
    fn validate_update(&self, stored: &Self) -> Result<(), RepositoryError> {
        if self.remote_gateway_last_proven_block_number < stored.remote_gateway_last_proven_block_number {
            return Err(RepositoryError::NonMonotonicUpdate {
                entity: Self::NAME,
                key: self.gateway_ga.to_string(),
                field: "remoteGatewayLastProvenBlockNumber",
                stored: stored.remote_gateway_last_proven_block_number,
                attempted: self.remote_gateway_last_proven_block_number,
            });
        }
        Ok(())
    }
}
