//! Typed-Data Hashing
//!
//! finalHash = H(prefix || domainHash || structHash)

use super::encoder::*;
use super::types::*;

/// Domain separator hash
///
/// domainHash = H(typeHash || H(name) || H(version) || chainId || verifyingContract || salt)
pub fn domain_hash(domain: &DomainSeparator) -> Result<[u8; 32], Eip712Error> {
    hash_hex_parts(&[
        encode_string(DOMAIN_TYPE),
        encode_string(&domain.name),
        encode_string(&domain.version),
        encode_u64(domain.chain_id),
        encode_address(&domain.verifying_authority),
        encode_bytes(&domain.salt),
    ])
}

/// Struct hash of a withdraw message for the given role
pub fn struct_hash(message: &WithdrawMessage, variant: WithdrawVariant) -> Result<[u8; 32], Eip712Error> {
    let mut parts = vec![
        encode_string(variant.type_string()),
        encode_address(&message.sender),
        encode_address(&message.collateral),
        encode_address(&message.asset),
        encode_u64(message.amount),
        encode_address(&message.receiver),
        encode_u32(message.nonce),
    ];
    if variant == WithdrawVariant::Coordinator {
        parts.push(encode_u64(message.expires_at));
    }
    hash_hex_parts(&parts)
}

/// Full digest with its components
pub fn typed_digest(
    domain: &DomainSeparator,
    message: &WithdrawMessage,
    variant: WithdrawVariant,
) -> Result<TypedDigest, Eip712Error> {
    let domain_hash = domain_hash(domain)?;
    let struct_hash = struct_hash(message, variant)?;
    let final_hash = hash_hex_parts(&[
        encode_bytes(&PADDING_PREFIX),
        encode_bytes(&domain_hash),
        encode_bytes(&struct_hash),
    ])?;

    Ok(TypedDigest {
        domain_hash,
        struct_hash,
        final_hash,
    })
}

/// Administrator message the wallet signs.
///
/// `salt` must be fresh per submission.
pub fn collateral_withdraw_digest(message: &WithdrawMessage, salt: [u8; 32]) -> Result<TypedDigest, Eip712Error> {
    let domain = DomainSeparator::collateral(message.collateral, salt);
    typed_digest(&domain, message, WithdrawVariant::Collateral)
}

/// Coordinator message the backend signed
pub fn coordinator_withdraw_digest(
    message: &WithdrawMessage,
    coordinator: solana_sdk::pubkey::Pubkey,
    salt: [u8; 32],
) -> Result<TypedDigest, Eip712Error> {
    let domain = DomainSeparator::coordinator(coordinator, salt);
    typed_digest(&domain, message, WithdrawVariant::Coordinator)
}
