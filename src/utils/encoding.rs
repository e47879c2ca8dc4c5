//! Text Encodings for Wallet Payloads
//!
//! Wallet payloads carry binary values as base58; signed transactions may come
//! back as base58 or base64.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;

/// Base58 alphabet (no 0, O, I, l)
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Explicit encoding tag carried next to payloads we control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    Base58,
    Base64,
}

pub fn encode_base58(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

pub fn decode_base58(value: &str) -> BridgeResult<Vec<u8>> {
    Ok(bs58::decode(value).into_vec()?)
}

/// Decode base64, padded or not, in the standard or URL-safe alphabet.
///
/// Whitespace (line wrapping included) is ignored.
pub fn decode_base64(value: &str) -> BridgeResult<Vec<u8>> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.trim_end_matches('=');
    match STANDARD_NO_PAD.decode(compact) {
        Ok(bytes) => Ok(bytes),
        Err(err) => Ok(URL_SAFE_NO_PAD.decode(compact).map_err(|_| err)?),
    }
}

/// True when every character belongs to the base58 alphabet
pub fn is_base58(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| BASE58_ALPHABET.contains(c))
}

/// Decode signed transaction bytes returned by the wallet.
///
/// An explicit tag wins. Without one, a string made only of base58 characters
/// is decoded as base58 and anything else as base64.
pub fn decode_transaction_bytes(value: &str, tag: Option<TextEncoding>) -> BridgeResult<Vec<u8>> {
    match tag {
        Some(TextEncoding::Base58) => decode_base58(value),
        Some(TextEncoding::Base64) => decode_base64(value),
        None if is_base58(value) => decode_base58(value),
        None => decode_base64(value),
    }
}
