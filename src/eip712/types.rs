//! Typed-Data Definitions
//!
//! Domain separators and withdrawal messages for the collateral and
//! coordinator authorization roles.

use solana_sdk::pubkey::Pubkey;

use crate::types::WithdrawRequest;

/// Domain type string
pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract,bytes32 salt)";

/// Struct type string of the administrator ("collateral withdraw") message
pub const COLLATERAL_WITHDRAW_TYPE: &str =
    "Withdraw(address user,address asset,uint256 amount,address recipient,uint256 nonce)";

/// Struct type string of the coordinator withdraw message
pub const COORDINATOR_WITHDRAW_TYPE: &str =
    "Withdraw(address user,address collateral,address asset,uint256 amount,address recipient,uint256 nonce,uint256 expiresAt)";

pub const COLLATERAL_DOMAIN_NAME: &str = "Collateral";
pub const COORDINATOR_DOMAIN_NAME: &str = "Coordinator";
pub const DOMAIN_VERSION: &str = "2";
/// Chain identifier the verifier binds both domains to
pub const DOMAIN_CHAIN_ID: u64 = 900;

/// Domain separator inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSeparator {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_authority: Pubkey,
    pub salt: [u8; 32],
}

impl DomainSeparator {
    /// Administrator domain, verified by the collateral account itself
    pub fn collateral(collateral: Pubkey, salt: [u8; 32]) -> Self {
        Self {
            name: COLLATERAL_DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id: DOMAIN_CHAIN_ID,
            verifying_authority: collateral,
            salt,
        }
    }

    /// Coordinator domain, verified by the collateral's coordinator account
    pub fn coordinator(coordinator: Pubkey, salt: [u8; 32]) -> Self {
        Self {
            name: COORDINATOR_DOMAIN_NAME.to_string(),
            version: DOMAIN_VERSION.to_string(),
            chain_id: DOMAIN_CHAIN_ID,
            verifying_authority: coordinator,
            salt,
        }
    }
}

/// Which authorization role a withdraw message is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawVariant {
    /// Administrator message: no expiry field
    Collateral,
    /// Coordinator message: adds `expiresAt`
    Coordinator,
}

impl WithdrawVariant {
    pub fn type_string(&self) -> &'static str {
        match self {
            WithdrawVariant::Collateral => COLLATERAL_WITHDRAW_TYPE,
            WithdrawVariant::Coordinator => COORDINATOR_WITHDRAW_TYPE,
        }
    }
}

/// Withdraw message fields shared by both roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawMessage {
    pub sender: Pubkey,
    pub collateral: Pubkey,
    pub asset: Pubkey,
    pub amount: u64,
    pub receiver: Pubkey,
    /// Administrator funds nonce read from the collateral account
    pub nonce: u32,
    pub expires_at: u64,
}

impl WithdrawMessage {
    pub fn new(
        collateral: Pubkey,
        sender: Pubkey,
        receiver: Pubkey,
        asset: Pubkey,
        request: &WithdrawRequest,
        admin_funds_nonce: u32,
    ) -> Self {
        Self {
            sender,
            collateral,
            asset,
            amount: request.amount_of_asset,
            receiver,
            nonce: admin_funds_nonce,
            expires_at: request.signature_expiration_time,
        }
    }
}

/// Digest components (for external signing and debugging)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedDigest {
    pub domain_hash: [u8; 32],
    pub struct_hash: [u8; 32],
    pub final_hash: [u8; 32],
}

/// Errors that can occur while building digests
#[derive(Debug, Clone, thiserror::Error)]
pub enum Eip712Error {
    #[error("Encoding error: {0}")]
    EncodingError(String),
}
