//! HTTP client for the authorization backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;

use super::parse::{parse_withdrawal_response, select_deposit_authority};
use super::types::{DepositResponse, WithdrawalAuthorization, WithdrawalRequestBody, WithdrawalResponse};
use crate::error::{BridgeError, BridgeResult};
use crate::types::WithdrawParams;
use crate::utils::config::{ApiCredentials, WithdrawalConfig};
use crate::{log_debug, log_info};

/// Source of withdrawal authorizations
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Withdrawal parameters plus the coordinator's salt and signature
    async fn authorize_withdrawal(&self, params: &WithdrawParams) -> BridgeResult<WithdrawalAuthorization>;

    /// Owner of the collateral's token account
    async fn deposit_authority(&self, collateral: &Pubkey) -> BridgeResult<Pubkey>;
}

pub struct HttpAuthorizationService {
    client: Client,
    withdrawal_url: String,
    deposit_url: String,
    credentials: ApiCredentials,
}

impl HttpAuthorizationService {
    pub fn new(config: &WithdrawalConfig) -> BridgeResult<Self> {
        config.credentials.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BridgeError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            withdrawal_url: config.withdrawal_url(),
            deposit_url: config.deposit_url(),
            credentials: config.credentials.clone(),
        })
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACCEPT, "application/json")
            .header("x-partner-code", &self.credentials.partner_code)
            .header("x-app-code", &self.credentials.app_code)
            .header("x-app-version", &self.credentials.app_version)
            .bearer_auth(&self.credentials.auth_token)
    }
}

/// Amount as the backend expects it: a JSON number
pub fn parse_amount(amount: &str) -> BridgeResult<serde_json::Number> {
    let trimmed = amount.trim();
    if let Ok(n) = trimmed.parse::<u64>() {
        return Ok(n.into());
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| *n >= 0.0)
        .and_then(serde_json::Number::from_f64)
        .ok_or_else(|| BridgeError::validation(format!("Invalid amount: {}", amount)))
}

/// Backend-provided reason for a rejection: `message`, else `error`
fn rejection_message(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> BridgeResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        let message = rejection_message(&body)
            .unwrap_or_else(|| format!("{} request failed with status {}", what, status));
        return Err(BridgeError::authorization(message).with_details(format!("status: {}", status)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| BridgeError::authorization(format!("Unparseable {} response: {}", what, e)))
}

#[async_trait]
impl AuthorizationService for HttpAuthorizationService {
    async fn authorize_withdrawal(&self, params: &WithdrawParams) -> BridgeResult<WithdrawalAuthorization> {
        params.validate()?;
        let body = WithdrawalRequestBody {
            chain_id: params.chain_id,
            token: params.token.trim().to_string(),
            amount: parse_amount(&params.amount)?,
            recipient_address: params.recipient_address.trim().to_string(),
        };

        log_debug!("api", "Requesting withdrawal authorization", recipient = body.recipient_address);
        let response = self
            .with_headers(self.client.post(&self.withdrawal_url))
            .json(&body)
            .send()
            .await?;
        let response: WithdrawalResponse = read_json(response, "Withdrawal").await?;

        let authorization = parse_withdrawal_response(&response)?;
        log_info!(
            "api",
            "Withdrawal authorized",
            collateral = authorization.collateral,
            amount = authorization.amount,
            expires_at = authorization.expires_at,
        );
        Ok(authorization)
    }

    async fn deposit_authority(&self, collateral: &Pubkey) -> BridgeResult<Pubkey> {
        let response = self
            .with_headers(self.client.get(&self.deposit_url))
            .send()
            .await?;
        let deposits: DepositResponse = read_json(response, "Deposit").await?;
        select_deposit_authority(&deposits, collateral)
    }
}
