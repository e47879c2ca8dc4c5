//! Shared types for the withdrawal client
//!
//! Data structures that cross module boundaries are defined here
//! for consistent serialization.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, BridgeResult};

// =============================================================================
// Cluster Types
// =============================================================================

/// Ledger clusters the wallet can be asked to connect on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    MainnetBeta,
    Testnet,
    Devnet,
}

impl Cluster {
    /// Name sent to the wallet in the connect request
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Testnet => "testnet",
            Cluster::Devnet => "devnet",
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Devnet => "https://api.devnet.solana.com",
        }
    }
}

impl std::str::FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "mainnet-beta" | "mainnet" => Ok(Cluster::MainnetBeta),
            "testnet" => Ok(Cluster::Testnet),
            "devnet" => Ok(Cluster::Devnet),
            _ => Err(format!("Unknown cluster: {}", s)),
        }
    }
}

// =============================================================================
// Withdrawal Types
// =============================================================================

/// Caller input for a withdrawal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawParams {
    /// Asset mint address
    pub token: String,
    /// Amount as entered by the user (numeric string)
    pub amount: String,
    /// Recipient wallet address
    pub recipient_address: String,
    /// Chain identifier expected by the authorization backend
    pub chain_id: u64,
}

impl WithdrawParams {
    /// Reject missing required input before anything touches the network
    pub fn validate(&self) -> BridgeResult<()> {
        if self.token.trim().is_empty()
            || self.amount.trim().is_empty()
            || self.recipient_address.trim().is_empty()
        {
            return Err(BridgeError::validation(
                "Please fill in token, recipient and amount",
            ));
        }
        Ok(())
    }
}

/// Withdrawal request as the collateral program receives it
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WithdrawRequest {
    /// Amount in the asset's smallest unit
    pub amount_of_asset: u64,
    /// Coordinator signature expiry (unix seconds)
    pub signature_expiration_time: u64,
    /// Domain salt the coordinator signed with
    pub coordinator_signature_salt: [u8; 32],
}
