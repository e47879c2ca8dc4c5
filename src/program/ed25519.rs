//! Ed25519 signature verification precompile
//!
//! Instruction data is a 16-byte offsets header followed by the public key,
//! the signature and the message, all carried inline (instruction index
//! `u16::MAX`).

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use solana_sdk::ed25519_program;
use solana_sdk::instruction::Instruction;

use crate::error::{BridgeError, BridgeResult};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;
pub const HEADER_LEN: usize = 16;

const INLINE: u16 = u16::MAX;
const PUBLIC_KEY_OFFSET: usize = HEADER_LEN;
const SIGNATURE_OFFSET: usize = PUBLIC_KEY_OFFSET + PUBLIC_KEY_LEN;
const MESSAGE_OFFSET: usize = SIGNATURE_OFFSET + SIGNATURE_LEN;

/// Build a precompile instruction verifying `signature` by `public_key` over `message`
pub fn new_ed25519_verify_instruction(
    public_key: &[u8; PUBLIC_KEY_LEN],
    signature: &[u8; SIGNATURE_LEN],
    message: &[u8],
) -> BridgeResult<Instruction> {
    let message_len = u16::try_from(message.len())
        .map_err(|_| BridgeError::validation("Message too long for the verification precompile"))?;

    let mut data = Vec::with_capacity(MESSAGE_OFFSET + message.len());
    data.push(1u8); // signature count
    data.push(0u8); // padding
    for field in [
        SIGNATURE_OFFSET as u16,
        INLINE,
        PUBLIC_KEY_OFFSET as u16,
        INLINE,
        MESSAGE_OFFSET as u16,
        message_len,
        INLINE,
    ] {
        data.extend_from_slice(&field.to_le_bytes());
    }
    data.extend_from_slice(public_key);
    data.extend_from_slice(signature);
    data.extend_from_slice(message);

    Ok(Instruction {
        program_id: ed25519_program::ID,
        accounts: vec![],
        data,
    })
}

/// Run the same check the runtime will, locally.
///
/// Returns `Ok(false)` for a well-formed instruction whose signature does
/// not verify.
pub fn verify_ed25519_instruction(instruction: &Instruction) -> BridgeResult<bool> {
    if instruction.program_id != ed25519_program::ID {
        return Err(BridgeError::validation("Not an Ed25519 verification instruction"));
    }
    let data = &instruction.data;
    if data.len() < MESSAGE_OFFSET || data[0] != 1 {
        return Err(BridgeError::validation("Malformed Ed25519 instruction data"));
    }

    let read_u16 = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]) as usize;
    let signature_offset = read_u16(2);
    let public_key_offset = read_u16(6);
    let message_offset = read_u16(10);
    let message_len = read_u16(12);

    let public_key: [u8; PUBLIC_KEY_LEN] = data
        .get(public_key_offset..public_key_offset + PUBLIC_KEY_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| BridgeError::validation("Ed25519 public key out of range"))?;
    let signature: [u8; SIGNATURE_LEN] = data
        .get(signature_offset..signature_offset + SIGNATURE_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| BridgeError::validation("Ed25519 signature out of range"))?;
    let message = data
        .get(message_offset..message_offset + message_len)
        .ok_or_else(|| BridgeError::validation("Ed25519 message out of range"))?;

    let Ok(key) = VerifyingKey::from_bytes(&public_key) else {
        return Ok(false);
    };
    Ok(key.verify(message, &Signature::from_bytes(&signature)).is_ok())
}
