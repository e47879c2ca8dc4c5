//! Runtime Configuration
//!
//! Bridge and withdrawal settings with defaults, environment overrides
//! and validation.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WALLET_BASE_URL` | Wallet universal-link base | `https://phantom.app/ul/v1` |
//! | `APP_URL` | App URL sent with connect | `https://yourapp.com` |
//! | `APP_REDIRECT_SCHEME` | Callback URI scheme | `yourapp` |
//! | `SOLANA_CLUSTER` | Cluster sent with connect | `devnet` |
//! | `WALLET_RESPONSE_TIMEOUT_SECS` | Wait bound for wallet replies | unset (wait forever) |
//! | `SOLANA_RPC_URL` | Ledger RPC endpoint | cluster default |
//! | `WITHDRAW_API_BASE_URL` | Authorization backend | `https://api-qa.orbitxpay.com` |
//! | `WITHDRAW_PARTNER_CODE` | Backend partner code | required |
//! | `WITHDRAW_APP_CODE` | Backend app code | required |
//! | `WITHDRAW_APP_VERSION` | Backend app version header | `2.8.0` |
//! | `WITHDRAW_AUTH_TOKEN` | Backend bearer token | required |
//! | `WITHDRAW_CHAIN_ID` | Backend chain id | `901` |
//! | `COORDINATOR_SIGNER` | Coordinator verification key | see [`DEFAULT_COORDINATOR_SIGNER`] |

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use url::Url;

use crate::error::{BridgeError, BridgeResult};
use crate::types::Cluster;
use crate::utils::logging::redact_value;

pub const DEFAULT_WALLET_BASE_URL: &str = "https://phantom.app/ul/v1";
pub const DEFAULT_APP_URL: &str = "https://yourapp.com";
pub const DEFAULT_REDIRECT_SCHEME: &str = "yourapp";
pub const DEFAULT_API_BASE_URL: &str = "https://api-qa.orbitxpay.com";
pub const DEFAULT_APP_VERSION: &str = "2.8.0";
pub const DEFAULT_BACKEND_CHAIN_ID: u64 = 901;
pub const DEFAULT_COORDINATOR_SIGNER: &str = "8pyuGBnfbCADScManuTtA23mjXmJDbzpgPw2R8tmC6gz";

/// Bridge (wallet deep-link) settings
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Base of the wallet's universal links; the operation is appended as a path segment
    pub wallet_base_url: String,
    pub app_url: String,
    pub redirect_scheme: String,
    pub cluster: Cluster,
    /// `None` waits for the wallet indefinitely
    pub response_timeout: Option<Duration>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            wallet_base_url: DEFAULT_WALLET_BASE_URL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            redirect_scheme: DEFAULT_REDIRECT_SCHEME.to_string(),
            cluster: Cluster::Devnet,
            response_timeout: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_env() -> BridgeResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = env::var("WALLET_BASE_URL") {
            config.wallet_base_url = v;
        }
        if let Ok(v) = env::var("APP_URL") {
            config.app_url = v;
        }
        if let Ok(v) = env::var("APP_REDIRECT_SCHEME") {
            config.redirect_scheme = v;
        }
        if let Ok(v) = env::var("SOLANA_CLUSTER") {
            config.cluster = Cluster::from_str(&v).map_err(BridgeError::validation)?;
        }
        if let Ok(v) = env::var("WALLET_RESPONSE_TIMEOUT_SECS") {
            let secs: u64 = v.parse().map_err(|_| {
                BridgeError::validation(format!("Invalid WALLET_RESPONSE_TIMEOUT_SECS: {}", v))
            })?;
            config.response_timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        require_https(&self.wallet_base_url, "wallet base URL")?;
        Url::parse(&self.app_url)?;

        let scheme_ok = !self.redirect_scheme.is_empty()
            && self
                .redirect_scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            && self
                .redirect_scheme
                .chars()
                .next()
                .map(|c| c.is_ascii_alphabetic())
                .unwrap_or(false);
        if !scheme_ok {
            return Err(BridgeError::validation(format!(
                "Invalid redirect scheme: {}",
                self.redirect_scheme
            )));
        }
        Ok(())
    }
}

/// Credentials for the authorization backend
#[derive(Clone, Default)]
pub struct ApiCredentials {
    pub partner_code: String,
    pub app_code: String,
    pub app_version: String,
    pub auth_token: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("partner_code", &self.partner_code)
            .field("app_code", &self.app_code)
            .field("app_version", &self.app_version)
            .field("auth_token", &redact_value(&self.auth_token))
            .finish()
    }
}

impl ApiCredentials {
    pub fn validate(&self) -> BridgeResult<()> {
        if self.partner_code.is_empty() || self.app_code.is_empty() || self.auth_token.is_empty() {
            return Err(BridgeError::validation("Missing required project API credentials"));
        }
        Ok(())
    }
}

/// Compute budget attached to a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    pub micro_lamports_per_unit: u64,
}

/// Withdrawal pipeline settings
#[derive(Debug, Clone)]
pub struct WithdrawalConfig {
    pub rpc_url: String,
    pub api_base_url: String,
    pub credentials: ApiCredentials,
    pub backend_chain_id: u64,
    /// Key the coordinator signs withdrawals with
    pub coordinator_signer: Pubkey,
    pub registration_budget: ComputeBudget,
    pub withdrawal_budget: ComputeBudget,
    /// Transport-level resends of the identical signed transaction
    pub max_retries: usize,
    pub poll_interval: Duration,
    pub poll_limit: u32,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            rpc_url: Cluster::Devnet.default_rpc_url().to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            credentials: ApiCredentials {
                app_version: DEFAULT_APP_VERSION.to_string(),
                ..ApiCredentials::default()
            },
            backend_chain_id: DEFAULT_BACKEND_CHAIN_ID,
            coordinator_signer: Pubkey::from_str(DEFAULT_COORDINATOR_SIGNER).unwrap_or_default(),
            registration_budget: ComputeBudget {
                unit_limit: 400_000,
                micro_lamports_per_unit: 1,
            },
            withdrawal_budget: ComputeBudget {
                unit_limit: 1_000_000,
                micro_lamports_per_unit: 5,
            },
            max_retries: 3,
            poll_interval: Duration::from_millis(500),
            poll_limit: 120,
        }
    }
}

impl WithdrawalConfig {
    pub fn from_env() -> BridgeResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = env::var("SOLANA_CLUSTER") {
            let cluster = Cluster::from_str(&v).map_err(BridgeError::validation)?;
            config.rpc_url = cluster.default_rpc_url().to_string();
        }
        if let Ok(v) = env::var("SOLANA_RPC_URL") {
            config.rpc_url = v;
        }
        if let Ok(v) = env::var("WITHDRAW_API_BASE_URL") {
            config.api_base_url = v;
        }
        if let Ok(v) = env::var("WITHDRAW_PARTNER_CODE") {
            config.credentials.partner_code = v;
        }
        if let Ok(v) = env::var("WITHDRAW_APP_CODE") {
            config.credentials.app_code = v;
        }
        if let Ok(v) = env::var("WITHDRAW_APP_VERSION") {
            config.credentials.app_version = v;
        }
        if let Ok(v) = env::var("WITHDRAW_AUTH_TOKEN") {
            config.credentials.auth_token = v;
        }
        if let Ok(v) = env::var("WITHDRAW_CHAIN_ID") {
            config.backend_chain_id = v
                .parse()
                .map_err(|_| BridgeError::validation(format!("Invalid WITHDRAW_CHAIN_ID: {}", v)))?;
        }
        if let Ok(v) = env::var("COORDINATOR_SIGNER") {
            config.coordinator_signer = Pubkey::from_str(&v)
                .map_err(|_| BridgeError::validation(format!("Invalid COORDINATOR_SIGNER: {}", v)))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        let rpc = Url::parse(&self.rpc_url)?;
        if !matches!(rpc.scheme(), "http" | "https") {
            return Err(BridgeError::validation(format!("Unsupported RPC scheme: {}", rpc.scheme())));
        }
        require_https(&self.api_base_url, "API base URL")?;
        if self.poll_limit == 0 {
            return Err(BridgeError::validation("poll_limit must be at least 1"));
        }
        Ok(())
    }

    pub fn withdrawal_url(&self) -> String {
        format!("{}/api/v1/wallet/withdrawal", self.api_base_url.trim_end_matches('/'))
    }

    pub fn deposit_url(&self) -> String {
        format!("{}/api/v1/wallet/deposit", self.api_base_url.trim_end_matches('/'))
    }
}

fn require_https(value: &str, what: &str) -> BridgeResult<Url> {
    let url = Url::parse(value)?;
    if url.scheme() != "https" {
        return Err(BridgeError::validation(format!("{} must use HTTPS: {}", what, value)));
    }
    Ok(url)
}
