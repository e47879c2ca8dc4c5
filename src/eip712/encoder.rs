//! Typed-Data Component Encoding
//!
//! Every component is rendered as lowercase hex text; components are joined
//! without separators and the joined text is hex-decoded before hashing.
//! String fields hash their UTF-8 bytes directly.

use solana_sdk::pubkey::Pubkey;

use super::types::Eip712Error;
use crate::utils::crypto::keccak256;

/// Two-byte typed-data prefix `\x19\x01`
pub const PADDING_PREFIX: [u8; 2] = [0x19, 0x01];

/// keccak256 of the UTF-8 text, as hex
pub fn encode_string(value: &str) -> String {
    hex::encode(keccak256(value.as_bytes()))
}

/// Raw 32-byte address as hex
pub fn encode_address(address: &Pubkey) -> String {
    hex::encode(address.to_bytes())
}

/// 32-bit integer as 8 hex digits, big-endian
pub fn encode_u32(value: u32) -> String {
    format!("{:08x}", value)
}

/// 64-bit integer as 16 hex digits, big-endian
pub fn encode_u64(value: u64) -> String {
    format!("{:016x}", value)
}

/// Arbitrary bytes as unseparated hex
pub fn encode_bytes(value: &[u8]) -> String {
    hex::encode(value)
}

/// Join hex components and hash the bytes they spell out
pub fn hash_hex_parts(parts: &[String]) -> Result<[u8; 32], Eip712Error> {
    let joined = parts.concat();
    let bytes = hex::decode(&joined).map_err(|e| Eip712Error::EncodingError(e.to_string()))?;
    Ok(keccak256(&bytes))
}
