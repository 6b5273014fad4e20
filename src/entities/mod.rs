//! Entity Model
//!
//! The persisted off-chain view of the two ledgers. Every entity is keyed by its
//! canonical identifier and carries creation and update timestamps that the
//! repository stamps on save.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::RepositoryError;

pub mod anchor;
pub mod gateway;
pub mod intents;
pub mod message;
pub mod token_pair;
pub mod transaction;

pub use anchor::Anchor;
pub use gateway::{Gateway, GatewayType};
pub use intents::{DepositIntent, Intent, WithdrawIntent};
pub use message::{Message, MessageStatus, MessageType};
pub use token_pair::Erc20GatewayTokenPair;
pub use transaction::Transaction;

/// Common behaviour of stored entities.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync;

    /// Entity name used in logs and errors.
    const NAME: &'static str;

    fn key(&self) -> Self::Key;

    fn created_at(&self) -> DateTime<Utc>;

    /// Stamps the repository-generated timestamps.
    fn touch(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>);

    /// Checks an update against the stored row. The default accepts any update.
    fn validate_update(&self, _stored: &Self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
