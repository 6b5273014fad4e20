//! AvailableStateRoots handler

use anyhow::Result;
use ethereum_types::U256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::records::AvailableStateRootRecord;
use crate::address::GlobalAddress;
use crate::entities::Anchor;
use crate::repositories::AnchorRepository;

/// Raises anchors to the highest newly available state root.
pub struct AvailableStateRootsHandler {
    anchor_repository: Arc<AnchorRepository>,
}

impl AvailableStateRootsHandler {
    pub fn new(anchor_repository: Arc<AnchorRepository>) -> Self {
        Self { anchor_repository }
    }

    /// Takes the highest block per anchor in the batch and raises each known anchor
    /// whose stored block is lower. Unknown anchors are ignored.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Anchor>)` - Anchors that were raised
    pub async fn handle(&self, records: &[AvailableStateRootRecord]) -> Result<Vec<Anchor>> {
        let mut highest: HashMap<GlobalAddress, U256> = HashMap::new();
        for record in records {
            match record.parse() {
                Ok((anchor_ga, block_number)) => {
                    let entry = highest.entry(anchor_ga).or_insert(block_number);
                    if block_number > *entry {
                        *entry = block_number;
                    }
                }
                Err(e) => warn!("Skipping malformed AvailableStateRoot record {:?}: {}", record, e),
            }
        }

        let mut raised = Vec::new();
        for (anchor_ga, block_number) in highest {
            match self
                .anchor_repository
                .raise_last_anchored_block_number(&anchor_ga, block_number)
                .await
            {
                Ok(Some(anchor)) => {
                    info!("Anchor {} raised to block {}", anchor_ga, block_number);
                    raised.push(anchor);
                }
                Ok(None) => debug!("Anchor {} unknown or already at block {} or later", anchor_ga, block_number),
                Err(e) => warn!("Failed to raise anchor {}: {}", anchor_ga, e),
            }
        }
        Ok(raised)
    }
}
