//! Bridge types and data structures

use std::fmt;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use zeroize::Zeroizing;

use crate::utils::encoding::TextEncoding;
use crate::utils::logging::redact_value;

/// Wallet operation requested over the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Connect,
    Disconnect,
    SignMessage,
    SignTransaction,
}

impl RequestKind {
    pub const ALL: [RequestKind; 4] = [
        RequestKind::Connect,
        RequestKind::Disconnect,
        RequestKind::SignMessage,
        RequestKind::SignTransaction,
    ];

    /// Operation path segment of the outbound URI
    pub fn path(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::SignMessage => "signMessage",
            Self::SignTransaction => "signTransaction",
        }
    }

    /// Callback name used as the host of the redirect link
    pub fn callback_name(&self) -> &'static str {
        match self {
            Self::Connect => "onConnected",
            Self::Disconnect => "onDisconnected",
            Self::SignMessage => "onMessageSigned",
            Self::SignTransaction => "onTransactionSigned",
        }
    }

    pub fn from_callback_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.callback_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Identifier tying a callback to the request that caused it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub(crate) String);

impl CorrelationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connected wallet session, created by a successful connect handshake
#[derive(Clone, PartialEq, Eq)]
pub struct WalletSession {
    /// Wallet (signer) address
    pub wallet: Pubkey,
    /// Opaque session token issued by the wallet
    pub session: Zeroizing<String>,
    /// Wallet's encryption public key for this connection
    pub peer_public_key: [u8; 32],
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("wallet", &self.wallet)
            .field("session", &redact_value(&self.session))
            .field("peer_public_key", &bs58::encode(self.peer_public_key).into_string())
            .finish()
    }
}

/// Result a wallet callback resolves a pending request with
#[derive(Debug, Clone)]
pub enum WalletResponse {
    Connected(WalletSession),
    Disconnected,
    MessageSigned(Signature),
    TransactionSigned(Transaction),
}

/// What happened to an inbound callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// A pending request was resolved
    Delivered(RequestKind),
    /// Nobody was waiting for this kind
    Unclaimed(RequestKind),
}

// =============================================================================
// Encrypted payloads
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct DisconnectPayload<'a> {
    pub session: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignMessagePayload<'a> {
    /// Base58 message bytes
    pub message: String,
    pub session: &'a str,
    pub display: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignTransactionPayload<'a> {
    /// Serialized unsigned transaction
    pub transaction: String,
    pub session: &'a str,
    pub encoding: TextEncoding,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectData {
    pub public_key: String,
    pub session: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignMessageData {
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignTransactionData {
    #[serde(alias = "signed_transaction")]
    pub transaction: String,
    #[serde(default)]
    pub encoding: Option<TextEncoding>,
}

/// Query parameter names of the deep-link protocol
pub mod params {
    pub const DAPP_PUBLIC_KEY: &str = "dapp_encryption_public_key";
    pub const WALLET_PUBLIC_KEY: &str = "phantom_encryption_public_key";
    pub const NONCE: &str = "nonce";
    pub const PAYLOAD: &str = "payload";
    pub const DATA: &str = "data";
    pub const REDIRECT_LINK: &str = "redirect_link";
    pub const CLUSTER: &str = "cluster";
    pub const APP_URL: &str = "app_url";
    pub const ERROR_CODE: &str = "errorCode";
    pub const ERROR_MESSAGE: &str = "errorMessage";
}
