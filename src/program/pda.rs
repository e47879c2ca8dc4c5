//! Program derived addresses

use solana_sdk::pubkey::Pubkey;

/// Seed prefix of the admin signature record
pub const ADMIN_SIGNATURES_SEED: &[u8] = b"CollateralAdminSignatures";

/// Admin signature record for one withdraw message.
///
/// Seeds are the fixed prefix, the collateral address and the raw
/// collateral-variant struct hash. The domain salt is not part of the
/// struct hash, so every resubmission of the same withdrawal lands on the
/// same record.
pub fn derive_admin_signatures_address(
    program_id: &Pubkey,
    collateral: &Pubkey,
    struct_hash: &[u8; 32],
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[ADMIN_SIGNATURES_SEED, collateral.as_ref(), struct_hash],
        program_id,
    )
}
