//! Facilitation Services Module
//!
//! Observers that turn repository changes into on-chain calls:
//! - `ConfirmDepositService` / `ConfirmWithdrawService` watch gateways and confirm
//!   messages covered by a newly proven block
//! - `ProveGatewayService` watches anchors and proves the source gateway at a newly
//!   anchored block when messages are waiting

use anyhow::{Context, Result};
use ethereum_types::{H256, U256};
use tracing::warn;

use crate::address::GlobalAddress;
use crate::entities::Gateway;
use crate::error::ProofError;
use crate::proof::{ProofGenerator, StorageProofData};

pub mod confirm_deposit;
pub mod confirm_withdraw;
pub mod prove_gateway;

pub use confirm_deposit::ConfirmDepositService;
pub use confirm_withdraw::ConfirmWithdrawService;
pub use prove_gateway::ProveGatewayService;

/// Proves `outbox[message_hash]` of `gateway` at `block_number`.
///
/// # Returns
///
/// * `Ok(Some(StorageProofData))` - The slot is populated and proven
/// * `Ok(None)` - The slot is still zero; the message is not yet provable at this block
/// * `Err(anyhow::Error)` - The proof request failed
pub(crate) async fn prove_outbox_message(
    proof_generator: &ProofGenerator,
    gateway: &GlobalAddress,
    message_hash: H256,
    block_number: U256,
) -> Result<Option<StorageProofData>> {
    let proof = proof_generator
        .get_outbox_proof(gateway, &[message_hash], block_number)
        .await
        .with_context(|| format!("Failed to prove message {:?} at block {}", message_hash, block_number))?;

    let storage = proof
        .storage_proofs
        .into_iter()
        .next()
        .ok_or_else(|| ProofError::MissingStorageProof(format!("{:?}", message_hash)))?;

    if storage.value.is_zero() {
        warn!(
            "Outbox slot of message {:?} on {} is empty at block {}, not yet provable",
            message_hash,
            gateway,
            block_number
        );
        return Ok(None);
    }
    Ok(Some(storage))
}

/// The record of `gateway_ga` with the highest proven block in a notification batch.
pub(crate) fn latest_for<'a>(gateways: &'a [Gateway], gateway_ga: &GlobalAddress) -> Option<&'a Gateway> {
    gateways
        .iter()
        .filter(|g| g.gateway_ga == *gateway_ga)
        .max_by_key(|g| g.remote_gateway_last_proven_block_number)
}
