//! Unified error types for the withdrawal client
//!
//! Every stage raises a categorized [`BridgeError`]; callers surface a single
//! descriptive message per failure, including simulation logs when present.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all bridge and withdrawal operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
    /// Program execution logs attached to a failed simulation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<String>,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            logs: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prefix the message with a human-readable context, keeping the code
    pub fn context(mut self, prefix: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", prefix, self.message);
        self
    }

    // Convenience constructors
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Protocol, msg)
    }

    pub fn wallet_rejected(code: impl fmt::Display, msg: impl fmt::Display) -> Self {
        Self::new(ErrorCode::WalletRejected, format!("Wallet returned error {}: {}", code, msg))
    }

    pub fn superseded(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Superseded, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, msg)
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Authorization, msg)
    }

    pub fn chain(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Chain, msg)
    }

    /// Simulation failure carrying every program log line, in order
    pub fn simulation_failed(logs: Vec<String>) -> Self {
        let mut err = Self::new(
            ErrorCode::Simulation,
            format!("Simulation failed:\n{}", logs.join("\n")),
        );
        err.logs = logs;
        err
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, msg)
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Encoding, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// True for the protocol family (malformed callbacks, wallet refusals, slot churn)
    pub fn is_protocol(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::Protocol | ErrorCode::WalletRejected | ErrorCode::Superseded | ErrorCode::Timeout
        )
    }

    /// True for the ledger family (missing accounts, simulation, broadcast)
    pub fn is_chain(&self) -> bool {
        matches!(self.code, ErrorCode::Chain | ErrorCode::Simulation)
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for BridgeError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Bridge protocol errors
    Protocol,
    WalletRejected,
    Superseded,
    Timeout,

    // Backend authorization errors
    Authorization,

    // Ledger errors
    Chain,
    Simulation,

    // Caller input
    Validation,

    // Conversions
    Json,
    Encoding,
    Network,
    Internal,
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

// Conversions from common error types

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::new(ErrorCode::Json, e.to_string())
    }
}

impl From<hex::FromHexError> for BridgeError {
    fn from(e: hex::FromHexError) -> Self {
        BridgeError::new(ErrorCode::Encoding, format!("Hex error: {}", e))
    }
}

impl From<bs58::decode::Error> for BridgeError {
    fn from(e: bs58::decode::Error) -> Self {
        BridgeError::new(ErrorCode::Encoding, format!("Base58 error: {}", e))
    }
}

impl From<base64::DecodeError> for BridgeError {
    fn from(e: base64::DecodeError) -> Self {
        BridgeError::new(ErrorCode::Encoding, format!("Base64 error: {}", e))
    }
}

impl From<bincode::Error> for BridgeError {
    fn from(e: bincode::Error) -> Self {
        BridgeError::new(ErrorCode::Encoding, format!("Transaction encoding error: {}", e))
    }
}

impl From<url::ParseError> for BridgeError {
    fn from(e: url::ParseError) -> Self {
        BridgeError::new(ErrorCode::Validation, format!("Invalid URL: {}", e))
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::new(ErrorCode::Internal, e.to_string())
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BridgeError::new(ErrorCode::Network, "Request timed out")
        } else if e.is_connect() {
            BridgeError::new(ErrorCode::Network, "Connection failed")
        } else if e.is_decode() {
            BridgeError::new(ErrorCode::Authorization, format!("Unparseable response: {}", e))
        } else {
            BridgeError::new(ErrorCode::Network, e.to_string())
        }
    }
}

impl From<crate::eip712::Eip712Error> for BridgeError {
    fn from(e: crate::eip712::Eip712Error) -> Self {
        BridgeError::new(ErrorCode::Encoding, e.to_string())
    }
}
