//! ERC20 gateway token pair

use chrono::{DateTime, Utc};

use super::Entity;
use crate::address::GlobalAddress;

/// Links a value token on the origin chain to the utility token minted for it on
/// the auxiliary chain. Keyed by the value-side gateway and the value token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc20GatewayTokenPair {
    pub gateway_ga: GlobalAddress,
    pub value_token: GlobalAddress,
    pub utility_token: GlobalAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Erc20GatewayTokenPair {
    pub fn new(gateway_ga: GlobalAddress, value_token: GlobalAddress, utility_token: GlobalAddress) -> Self {
        let now = Utc::now();
        Self {
            gateway_ga,
            value_token,
            utility_token,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Erc20GatewayTokenPair {
    type Key = (GlobalAddress, GlobalAddress);
    const NAME: &'static str = "ERC20GatewayTokenPair";

    fn key(&self) -> (GlobalAddress, GlobalAddress) {
        (self.gateway_ga, self.value_token)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }
}
