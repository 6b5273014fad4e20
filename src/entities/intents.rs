//! Deposit and withdraw intents
//!
//! Each intent carries the payload of a message with the same hash. Fields are only
//! ever filled in, never overwritten.

use chrono::{DateTime, Utc};
use ethereum_types::{H256, U256};

use super::Entity;
use crate::address::GlobalAddress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositIntent {
    pub message_hash: H256,
    pub token_address: Option<GlobalAddress>,
    pub amount: Option<U256>,
    pub beneficiary: Option<GlobalAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawIntent {
    pub message_hash: H256,
    /// Utility token being withdrawn
    pub token_address: Option<GlobalAddress>,
    pub amount: Option<U256>,
    pub beneficiary: Option<GlobalAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Behaviour shared by deposit and withdraw intents.
pub trait Intent: Entity<Key = H256> {
    fn create(message_hash: H256, token_address: GlobalAddress, amount: U256, beneficiary: GlobalAddress) -> Self;

    /// Fills fields that are still unset. Returns whether anything changed.
    fn fill_missing(&mut self, token_address: GlobalAddress, amount: U256, beneficiary: GlobalAddress) -> bool;
}

macro_rules! intent_impl {
    ($intent:ident, $name:literal) => {
        impl Intent for $intent {
            fn create(
                message_hash: H256,
                token_address: GlobalAddress,
                amount: U256,
                beneficiary: GlobalAddress,
            ) -> Self {
                let now = Utc::now();
                Self {
                    message_hash,
                    token_address: Some(token_address),
                    amount: Some(amount),
                    beneficiary: Some(beneficiary),
                    created_at: now,
                    updated_at: now,
                }
            }

            fn fill_missing(
                &mut self,
                token_address: GlobalAddress,
                amount: U256,
                beneficiary: GlobalAddress,
            ) -> bool {
                let mut changed = false;
                if self.token_address.is_none() {
                    self.token_address = Some(token_address);
                    changed = true;
                }
                if self.amount.is_none() {
                    self.amount = Some(amount);
                    changed = true;
                }
                if self.beneficiary.is_none() {
                    self.beneficiary = Some(beneficiary);
                    changed = true;
                }
                changed
            }
        }

        impl Entity for $intent {
            type Key = H256;
            const NAME: &'static str = $name;

            fn key(&self) -> H256 {
                self.message_hash
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn touch(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
                self.created_at = created_at;
                self.updated_at = updated_at;
            }
        }
    };
}

intent_impl!(DepositIntent, "DepositIntent");
intent_impl!(WithdrawIntent, "WithdrawIntent");
