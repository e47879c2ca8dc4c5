//! Authorization backend payloads

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Body of the withdrawal authorization request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequestBody {
    pub chain_id: u64,
    pub token: String,
    pub amount: serde_json::Number,
    pub recipient_address: String,
}

/// Signature package returned alongside the parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignaturePackage {
    #[serde(default)]
    pub salt: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Raw withdrawal authorization response.
///
/// `parameters` stays untyped: entries arrive as strings, numbers or byte
/// arrays depending on the backend version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithdrawalResponse {
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub signature: Option<SignaturePackage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositEntry {
    pub proxy_address: String,
    #[serde(default)]
    pub deposit_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositResponse {
    #[serde(default)]
    pub deposits: Vec<DepositEntry>,
}

/// Everything the backend authorizes for one withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalAuthorization {
    /// Collateral (proxy) account
    pub collateral: Pubkey,
    pub asset: Pubkey,
    /// Amount in the asset's smallest unit
    pub amount: u64,
    pub recipient: Pubkey,
    /// Coordinator signature expiry (unix seconds)
    pub expires_at: u64,
    pub coordinator_salt: [u8; 32],
    pub coordinator_signature: [u8; 64],
}
