//! Response parsing

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;

use super::types::{DepositResponse, WithdrawalAuthorization, WithdrawalResponse};
use crate::error::{BridgeError, BridgeResult};

const COLLATERAL: usize = 0;
const ASSET: usize = 1;
const AMOUNT: usize = 2;
const RECIPIENT: usize = 3;
const EXPIRES_AT: usize = 4;
const SALT: usize = 5;
const SIGNATURE: usize = 6;

pub fn parse_withdrawal_response(response: &WithdrawalResponse) -> BridgeResult<WithdrawalAuthorization> {
    let parameters = match &response.parameters {
        Some(Value::Array(parameters)) => parameters,
        _ => return Err(BridgeError::authorization("Invalid signature response received")),
    };

    let status = match &response.status {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    if matches!(status.to_lowercase().as_str(), "pending" | "processing") {
        return Err(BridgeError::authorization(format!("Signature is not ready: {}", status)));
    }

    let salt = match response.signature.as_ref().and_then(|s| non_empty(&s.salt)) {
        Some(salt) => base64_field(salt, "coordinator signature salt")?,
        None => match parameters.get(SALT) {
            Some(v @ Value::Array(_)) => byte_array(v, "coordinator signature salt")?,
            Some(Value::String(s)) => base64_field(s, "coordinator signature salt")?,
            _ => return Err(BridgeError::authorization("Unable to parse coordinator signature salt")),
        },
    };

    let signature = match response.signature.as_ref().and_then(|s| non_empty(&s.data)) {
        Some(data) => match data.strip_prefix("0x") {
            Some(hex_data) => hex::decode(hex_data).map_err(|e| {
                BridgeError::authorization(format!("Invalid coordinator signature: {}", e))
            })?,
            None => base64_field(data, "coordinator signature")?,
        },
        None => match parameters.get(SIGNATURE) {
            Some(Value::String(s)) if !s.is_empty() => base64_field(s, "coordinator signature")?,
            Some(v @ Value::Array(_)) => byte_array(v, "coordinator signature")?,
            _ => return Err(BridgeError::authorization("Unable to parse coordinator signature data")),
        },
    };

    Ok(WithdrawalAuthorization {
        collateral: pubkey_param(parameters, COLLATERAL, "collateral address")?,
        asset: pubkey_param(parameters, ASSET, "asset address")?,
        amount: u64_param(parameters, AMOUNT, "amount")?,
        recipient: pubkey_param(parameters, RECIPIENT, "recipient address")?,
        expires_at: u64_param(parameters, EXPIRES_AT, "expiry")?,
        coordinator_salt: fixed(salt, "coordinator signature salt")?,
        coordinator_signature: fixed(signature, "coordinator signature")?,
    })
}

/// Deposit authority of the collateral proxy. Falls back to the proxy itself.
pub fn select_deposit_authority(response: &DepositResponse, collateral: &Pubkey) -> BridgeResult<Pubkey> {
    let proxy = collateral.to_string();
    let entry = response
        .deposits
        .iter()
        .find(|d| d.proxy_address == proxy)
        .ok_or_else(|| BridgeError::authorization("Contract not found"))?;

    let address = entry
        .deposit_address
        .as_deref()
        .filter(|a| !a.is_empty())
        .unwrap_or(&entry.proxy_address);
    Pubkey::from_str(address)
        .map_err(|_| BridgeError::authorization(format!("Invalid deposit address: {}", address)))
}

fn base64_field(value: &str, what: &str) -> BridgeResult<Vec<u8>> {
    STANDARD
        .decode(value.trim())
        .map_err(|e| BridgeError::authorization(format!("Invalid {}: {}", what, e)))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn pubkey_param(parameters: &[Value], index: usize, what: &str) -> BridgeResult<Pubkey> {
    parameters
        .get(index)
        .and_then(Value::as_str)
        .and_then(|s| Pubkey::from_str(s).ok())
        .ok_or_else(|| BridgeError::authorization(format!("Invalid {} in authorization", what)))
}

fn u64_param(parameters: &[Value], index: usize, what: &str) -> BridgeResult<u64> {
    let parsed = match parameters.get(index) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| BridgeError::authorization(format!("Invalid {} in authorization", what)))
}

fn byte_array(value: &Value, what: &str) -> BridgeResult<Vec<u8>> {
    let invalid = || BridgeError::authorization(format!("Invalid {} bytes", what));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()).ok_or_else(invalid))
        .collect()
}

fn fixed<const N: usize>(bytes: Vec<u8>, what: &str) -> BridgeResult<[u8; N]> {
    let len = bytes.len();
    bytes.try_into().map_err(|_| {
        BridgeError::authorization(format!("Invalid {} length: expected {}, got {}", what, N, len))
    })
}
