//! Collateral program instructions
//!
//! Anchor encoding: the first 8 bytes of `sha256("global:<name>")`
//! followed by the Borsh-encoded arguments.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{system_program, sysvar};

use super::token::TOKEN_PROGRAM_ID;
use crate::error::BridgeResult;
use crate::types::WithdrawRequest;
use crate::utils::config::ComputeBudget;
use crate::utils::crypto::sha256;

pub const SUBMIT_SIGNATURES: &str = "submit_signatures";
pub const WITHDRAW_COLLATERAL_ASSET: &str = "withdraw_collateral_asset";

pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let hash = sha256(format!("global:{}", name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}

/// What an admin signature submission authorizes
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum SignatureSubmissionType {
    WithdrawCollateralAsset {
        sender: [u8; 32],
        receiver: [u8; 32],
        asset: [u8; 32],
        withdraw_request: WithdrawRequest,
    },
}

impl SignatureSubmissionType {
    pub fn withdraw_collateral_asset(
        sender: &Pubkey,
        receiver: &Pubkey,
        asset: &Pubkey,
        withdraw_request: WithdrawRequest,
    ) -> Self {
        Self::WithdrawCollateralAsset {
            sender: sender.to_bytes(),
            receiver: receiver.to_bytes(),
            asset: asset.to_bytes(),
            withdraw_request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SubmitSignaturesArgs {
    /// Domain salts, one per submitted signature
    pub salts: Vec<[u8; 32]>,
    pub target_nonce: u32,
    pub signature_submission_type: SignatureSubmissionType,
}

#[derive(Debug, Clone, Copy)]
pub struct SubmitSignaturesAccounts {
    pub collateral: Pubkey,
    pub admin_signatures: Pubkey,
    pub rent_payer: Pubkey,
}

#[derive(Debug, Clone, Copy)]
pub struct WithdrawAccounts {
    pub sender: Pubkey,
    pub receiver: Pubkey,
    pub asset: Pubkey,
    pub collateral_token_account: Pubkey,
    pub receiver_token_account: Pubkey,
    pub coordinator: Pubkey,
    pub collateral: Pubkey,
    pub admin_signatures: Pubkey,
}

fn anchor_data<T: BorshSerialize>(name: &str, args: &T) -> BridgeResult<Vec<u8>> {
    let mut data = instruction_discriminator(name).to_vec();
    data.extend(borsh::to_vec(args)?);
    Ok(data)
}

/// Register admin signatures; the preceding instruction must be the matching
/// Ed25519 verification
pub fn submit_signatures(
    program_id: &Pubkey,
    accounts: &SubmitSignaturesAccounts,
    args: &SubmitSignaturesArgs,
) -> BridgeResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.collateral, false),
            AccountMeta::new(accounts.admin_signatures, false),
            AccountMeta::new(accounts.rent_payer, true),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(sysvar::instructions::ID, false),
        ],
        data: anchor_data(SUBMIT_SIGNATURES, args)?,
    })
}

pub fn withdraw_collateral_asset(
    program_id: &Pubkey,
    accounts: &WithdrawAccounts,
    request: &WithdrawRequest,
) -> BridgeResult<Instruction> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.sender, true),
            AccountMeta::new_readonly(accounts.receiver, false),
            AccountMeta::new_readonly(accounts.asset, false),
            AccountMeta::new(accounts.collateral_token_account, false),
            AccountMeta::new(accounts.receiver_token_account, false),
            AccountMeta::new_readonly(accounts.coordinator, false),
            AccountMeta::new(accounts.collateral, false),
            AccountMeta::new(accounts.admin_signatures, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(sysvar::instructions::ID, false),
        ],
        data: anchor_data(WITHDRAW_COLLATERAL_ASSET, request)?,
    })
}

/// Unit limit then unit price
pub fn compute_budget_instructions(budget: &ComputeBudget) -> [Instruction; 2] {
    [
        ComputeBudgetInstruction::set_compute_unit_limit(budget.unit_limit),
        ComputeBudgetInstruction::set_compute_unit_price(budget.micro_lamports_per_unit),
    ]
}
