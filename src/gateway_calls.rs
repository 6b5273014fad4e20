//! Gateway Call Encoding
//!
//! ABI calldata for the token and gateway contract calls the facilitator submits.

use ethereum_types::U256;
use sha3::{Digest, Keccak256};

use crate::address::{u256_to_word, GlobalAddress};

// ============================================================================
// FUNCTION SIGNATURES
// ============================================================================

pub const APPROVE: &str = "approve(address,uint256)";
pub const DEPOSIT: &str = "deposit(uint256,address,uint256,uint256,address)";
pub const WITHDRAW: &str = "withdraw(uint256,address,uint256,uint256,address)";
pub const CONFIRM_DEPOSIT: &str =
    "confirmDeposit(address,uint256,address,uint256,uint256,address,uint256,bytes)";
pub const CONFIRM_WITHDRAW: &str =
    "confirmWithdraw(address,address,uint256,address,uint256,uint256,address,uint256,bytes)";
pub const PROVE_GATEWAY: &str = "proveGateway(uint256,bytes,bytes)";

// ============================================================================
// ABI ENCODING
// ============================================================================

/// One ABI argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(GlobalAddress),
    Uint(U256),
    Bytes(Vec<u8>),
}

/// First four bytes of keccak256(signature).
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encodes a call: selector, one head word per argument, then the tails of
/// dynamic arguments (length word plus right-padded data).
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let head_size = tokens.len() * 32;
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Address(address) => {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(address.as_bytes());
                head.extend_from_slice(&word);
            }
            Token::Uint(value) => head.extend_from_slice(&u256_to_word(*value)),
            Token::Bytes(bytes) => {
                head.extend_from_slice(&u256_to_word(U256::from((head_size + tail.len()) as u64)));
                tail.extend_from_slice(&u256_to_word(U256::from(bytes.len() as u64)));
                tail.extend_from_slice(bytes);
                let padding = (32 - bytes.len() % 32) % 32;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        }
    }

    let mut data = Vec::with_capacity(4 + head.len() + tail.len());
    data.extend_from_slice(&selector(signature));
    data.extend(head);
    data.extend(tail);
    data
}

// ============================================================================
// CALL BUILDERS
// ============================================================================

/// ERC20 `approve(spender, amount)`.
pub fn approve(spender: &GlobalAddress, amount: U256) -> Vec<u8> {
    encode_call(APPROVE, &[Token::Address(*spender), Token::Uint(amount)])
}

/// Parameters shared by `deposit` and `withdraw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub amount: U256,
    pub beneficiary: GlobalAddress,
    pub fee_gas_price: U256,
    pub fee_gas_limit: U256,
    /// Value token for a deposit, utility token for a withdraw
    pub token: GlobalAddress,
}

impl TransferRequest {
    fn tokens(&self) -> [Token; 5] {
        [
            Token::Uint(self.amount),
            Token::Address(self.beneficiary),
            Token::Uint(self.fee_gas_price),
            Token::Uint(self.fee_gas_limit),
            Token::Address(self.token),
        ]
    }
}

/// Gateway `deposit` on the origin chain.
pub fn deposit(request: &TransferRequest) -> Vec<u8> {
    encode_call(DEPOSIT, &request.tokens())
}

/// Cogateway `withdraw` on the auxiliary chain.
pub fn withdraw(request: &TransferRequest) -> Vec<u8> {
    encode_call(WITHDRAW, &request.tokens())
}

/// Arguments of `confirmDeposit`, submitted to the cogateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDepositCall {
    pub value_token: GlobalAddress,
    pub amount: U256,
    pub beneficiary: GlobalAddress,
    pub fee_gas_price: U256,
    pub fee_gas_limit: U256,
    pub depositor: GlobalAddress,
    pub block_number: U256,
    pub rlp_parent_nodes: Vec<u8>,
}

pub fn confirm_deposit(call: &ConfirmDepositCall) -> Vec<u8> {
    encode_call(
        CONFIRM_DEPOSIT,
        &[
            Token::Address(call.value_token),
            Token::Uint(call.amount),
            Token::Address(call.beneficiary),
            Token::Uint(call.fee_gas_price),
            Token::Uint(call.fee_gas_limit),
            Token::Address(call.depositor),
            Token::Uint(call.block_number),
            Token::Bytes(call.rlp_parent_nodes.clone()),
        ],
    )
}

/// Arguments of `confirmWithdraw`, submitted to the origin gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmWithdrawCall {
    pub utility_token: GlobalAddress,
    pub value_token: GlobalAddress,
    pub amount: U256,
    pub beneficiary: GlobalAddress,
    pub fee_gas_price: U256,
    pub fee_gas_limit: U256,
    pub withdrawer: GlobalAddress,
    pub block_number: U256,
    pub rlp_parent_nodes: Vec<u8>,
}

pub fn confirm_withdraw(call: &ConfirmWithdrawCall) -> Vec<u8> {
    encode_call(
        CONFIRM_WITHDRAW,
        &[
            Token::Address(call.utility_token),
            Token::Address(call.value_token),
            Token::Uint(call.amount),
            Token::Address(call.beneficiary),
            Token::Uint(call.fee_gas_price),
            Token::Uint(call.fee_gas_limit),
            Token::Address(call.withdrawer),
            Token::Uint(call.block_number),
            Token::Bytes(call.rlp_parent_nodes.clone()),
        ],
    )
}

/// `proveGateway(blockNumber, rlpAccount, rlpParentNodes)` on the remote gateway.
pub fn prove_gateway(block_number: U256, rlp_account: &[u8], rlp_parent_nodes: &[u8]) -> Vec<u8> {
    encode_call(
        PROVE_GATEWAY,
        &[
            Token::Uint(block_number),
            Token::Bytes(rlp_account.to_vec()),
            Token::Bytes(rlp_parent_nodes.to_vec()),
        ],
    )
}
