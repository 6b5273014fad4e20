//! Indexed Record Shapes
//!
//! Records delivered by the event indexer. Every field arrives as a string; `parse`
//! converts a record into typed values or reports the first malformed field.

use ethereum_types::{H256, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::address::{parse_hash, parse_u256, GlobalAddress};
use crate::error::RecordError;

fn address(s: &str) -> Result<GlobalAddress, RecordError> {
    GlobalAddress::from_str(s)
}

// ============================================================================
// ANCHOR AND GATEWAY RECORDS
// ============================================================================

/// A state root of the remote chain became available on an anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableStateRootRecord {
    /// Anchor contract
    pub contract_address: String,
    /// Remote chain block whose state root is now anchored
    pub block_number: String,
}

impl AvailableStateRootRecord {
    pub fn parse(&self) -> Result<(GlobalAddress, U256), RecordError> {
        Ok((address(&self.contract_address)?, parse_u256(&self.block_number)?))
    }
}

/// A gateway proved the storage of its remote gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayProvenRecord {
    /// Gateway that accepted the proof
    pub contract_address: String,
    /// Gateway whose state was proven
    pub remote_gateway: String,
    /// Proven block height of the remote gateway's chain
    pub block_number: String,
}

pub struct GatewayProven {
    pub contract_address: GlobalAddress,
    pub remote_gateway: GlobalAddress,
    pub block_number: U256,
}

impl GatewayProvenRecord {
    pub fn parse(&self) -> Result<GatewayProven, RecordError> {
        Ok(GatewayProven {
            contract_address: address(&self.contract_address)?,
            remote_gateway: address(&self.remote_gateway)?,
            block_number: parse_u256(&self.block_number)?,
        })
    }
}

/// The cogateway deployed a utility token for a value token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedUtilityTokenRecord {
    /// Cogateway that created the token
    pub contract_address: String,
    pub value_token: String,
    pub utility_token: String,
    #[serde(default)]
    pub block_number: Option<String>,
}

pub struct CreatedUtilityToken {
    pub contract_address: GlobalAddress,
    pub value_token: GlobalAddress,
    pub utility_token: GlobalAddress,
}

impl CreatedUtilityTokenRecord {
    pub fn parse(&self) -> Result<CreatedUtilityToken, RecordError> {
        Ok(CreatedUtilityToken {
            contract_address: address(&self.contract_address)?,
            value_token: address(&self.value_token)?,
            utility_token: address(&self.utility_token)?,
        })
    }
}

// ============================================================================
// MESSAGE RECORDS
// ============================================================================

/// A deposit declared on the origin gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredDepositIntentRecord {
    pub contract_address: String,
    pub message_hash: String,
    pub value_token: String,
    pub amount: String,
    pub beneficiary: String,
    pub fee_gas_price: String,
    pub fee_gas_limit: String,
    pub depositor: String,
    pub nonce: String,
    pub block_number: String,
}

/// A withdraw declared on the cogateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredWithdrawIntentRecord {
    pub contract_address: String,
    pub message_hash: String,
    pub utility_token: String,
    pub amount: String,
    pub beneficiary: String,
    pub fee_gas_price: String,
    pub fee_gas_limit: String,
    pub withdrawer: String,
    pub nonce: String,
    pub block_number: String,
}

/// A declared message with typed fields, common to deposits and withdraws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredIntent {
    /// Source gateway
    pub contract_address: GlobalAddress,
    pub message_hash: H256,
    /// Value token for deposits, utility token for withdraws
    pub token: GlobalAddress,
    pub amount: U256,
    pub beneficiary: GlobalAddress,
    pub fee_gas_price: U256,
    pub fee_gas_limit: U256,
    pub sender: GlobalAddress,
    pub nonce: U256,
    pub block_number: U256,
}

impl DeclaredDepositIntentRecord {
    pub fn parse(&self) -> Result<DeclaredIntent, RecordError> {
        Ok(DeclaredIntent {
            contract_address: address(&self.contract_address)?,
            message_hash: parse_hash(&self.message_hash)?,
            token: address(&self.value_token)?,
            amount: parse_u256(&self.amount)?,
            beneficiary: address(&self.beneficiary)?,
            fee_gas_price: parse_u256(&self.fee_gas_price)?,
            fee_gas_limit: parse_u256(&self.fee_gas_limit)?,
            sender: address(&self.depositor)?,
            nonce: parse_u256(&self.nonce)?,
            block_number: parse_u256(&self.block_number)?,
        })
    }
}

impl DeclaredWithdrawIntentRecord {
    pub fn parse(&self) -> Result<DeclaredIntent, RecordError> {
        Ok(DeclaredIntent {
            contract_address: address(&self.contract_address)?,
            message_hash: parse_hash(&self.message_hash)?,
            token: address(&self.utility_token)?,
            amount: parse_u256(&self.amount)?,
            beneficiary: address(&self.beneficiary)?,
            fee_gas_price: parse_u256(&self.fee_gas_price)?,
            fee_gas_limit: parse_u256(&self.fee_gas_limit)?,
            sender: address(&self.withdrawer)?,
            nonce: parse_u256(&self.nonce)?,
            block_number: parse_u256(&self.block_number)?,
        })
    }
}

/// A message confirmed on its destination gateway. Used for both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmIntentRecord {
    /// Destination gateway
    pub contract_address: String,
    pub message_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
}

impl ConfirmIntentRecord {
    pub fn parse(&self) -> Result<(GlobalAddress, H256), RecordError> {
        Ok((address(&self.contract_address)?, parse_hash(&self.message_hash)?))
    }
}
