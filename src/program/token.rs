//! Associated token accounts

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;

pub const TOKEN_PROGRAM_ID: Pubkey = pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Associated token account of (owner, mint). Owners may be off-curve (PDAs).
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}

/// Create the associated token account of (owner, mint), paid by `payer`
pub fn create_associated_token_account(payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    let account = associated_token_address(owner, mint);
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(account, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_associated_address_is_deterministic() {
        let owner = Pubkey::from_str("BeJmtM2wd8td4Cyz9sWWN4dhZU1yMeJpAKgfBzD44gmE").unwrap();
        let mint = Pubkey::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
        let ata = associated_token_address(&owner, &mint);
        assert_eq!(ata, associated_token_address(&owner, &mint));
        assert_ne!(ata, associated_token_address(&mint, &owner));
    }

    #[test]
    fn test_off_curve_owner() {
        let (pda, _) = Pubkey::find_program_address(&[b"deposit"], &Pubkey::new_unique());
        let mint = Pubkey::new_unique();
        // Derivation does not care whether the owner is on the curve
        let ata = associated_token_address(&pda, &mint);
        assert!(!ata.is_on_curve());
    }

    #[test]
    fn test_create_instruction_layout() {
        let payer = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = create_associated_token_account(&payer, &owner, &mint);

        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert!(ix.data.is_empty());
        assert_eq!(ix.accounts.len(), 6);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, associated_token_address(&owner, &mint));
        assert!(ix.accounts[1].is_writable);
        assert_eq!(ix.accounts[5].pubkey, TOKEN_PROGRAM_ID);
    }
}
