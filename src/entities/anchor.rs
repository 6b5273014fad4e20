//! Anchor entity

use chrono::{DateTime, Utc};
use ethereum_types::U256;

use super::Entity;
use crate::address::GlobalAddress;
use crate::error::RepositoryError;

/// A contract that records state roots of the other chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub anchor_ga: GlobalAddress,
    pub last_anchored_block_number: U256,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Anchor {
    pub fn new(anchor_ga: GlobalAddress, last_anchored_block_number: U256) -> Self {
        let now = Utc::now();
        Self {
            anchor_ga,
            last_anchored_block_number,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Anchor {
    type Key = GlobalAddress;
    const NAME: &'static str = "Anchor";

    fn key(&self) -> GlobalAddress {
        self.anchor_ga
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = created_at;
        self.updated_at = updated_at;
    }

    /// An update must strictly raise the anchored block number.
    fn validate_update(&self, stored: &Self) -> Result<(), RepositoryError> {
        if self.last_anchored_block_number <= stored.last_anchored_block_number {
            return Err(RepositoryError::NonMonotonicUpdate {
                entity: Self::NAME,
                key: self.anchor_ga.to_string(),
                field: "lastAnchoredBlockNumber",
                stored: stored.last_anchored_block_number,
                attempted: self.last_anchored_block_number,
            });
        }
        Ok(())
    }
}
