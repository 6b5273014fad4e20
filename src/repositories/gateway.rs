//! Gateway and anchor queries

use ethereum_types::U256;

use super::Repository;
use crate::address::GlobalAddress;
use crate::entities::{Anchor, Gateway};
use crate::error::RepositoryError;

pub type GatewayRepository = Repository<Gateway>;
pub type AnchorRepository = Repository<Anchor>;

impl Repository<Gateway> {
    /// Returns the gateway whose anchor is `anchor_ga`.
    pub async fn get_by_anchor(&self, anchor_ga: &GlobalAddress) -> Option<Gateway> {
        self.find(|g| g.anchor_ga == *anchor_ga).await.into_iter().next()
    }

    /// Raises the proven block number of a gateway if `block_number` is strictly
    /// greater than the stored one.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Gateway))` - The gateway was raised
    /// * `Ok(None)` - Unknown gateway, or the stored value is already at least `block_number`
    pub async fn raise_remote_gateway_last_proven_block_number(
        &self,
        gateway_ga: &GlobalAddress,
        block_number: U256,
    ) -> Result<Option<Gateway>, RepositoryError> {
        self.compare_and_save(gateway_ga, |gateway| {
            (block_number > gateway.remote_gateway_last_proven_block_number).then(|| Gateway {
                remote_gateway_last_proven_block_number: block_number,
                ..gateway.clone()
            })
        })
        .await
    }
}

impl Repository<Anchor> {
    /// Raises the anchored block number if `block_number` is strictly greater than the
    /// stored one.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Anchor))` - The anchor was raised
    /// * `Ok(None)` - Unknown anchor, or the stored value is already at least `block_number`
    pub async fn raise_last_anchored_block_number(
        &self,
        anchor_ga: &GlobalAddress,
        block_number: U256,
    ) -> Result<Option<Anchor>, RepositoryError> {
        self.compare_and_save(anchor_ga, |anchor| {
            (block_number > anchor.last_anchored_block_number).then(|| Anchor {
                last_anchored_block_number: block_number,
                ..anchor.clone()
            })
        })
        .await
    }
}
