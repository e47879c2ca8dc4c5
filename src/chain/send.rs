//! Sign, broadcast and confirm

use std::time::Duration;

use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use super::ledger::{ConfirmationStatus, Ledger};
use crate::error::{BridgeError, BridgeResult};
use crate::utils::config::WithdrawalConfig;
use crate::wallet::WalletSigner;
use crate::{log_debug, log_info};

/// Broadcast and confirmation bounds
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub max_retries: usize,
    pub poll_interval: Duration,
    pub poll_limit: u32,
}

impl From<&WithdrawalConfig> for SendOptions {
    fn from(config: &WithdrawalConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            poll_interval: config.poll_interval,
            poll_limit: config.poll_limit,
        }
    }
}

/// Unsigned transaction paid by `payer`, with no block reference yet
pub fn unsigned_transaction(instructions: &[Instruction], payer: &Pubkey) -> Transaction {
    Transaction::new_with_payer(instructions, Some(payer))
}

/// Attach a block reference if missing, have the wallet sign, broadcast,
/// and wait for `confirmed`.
pub async fn sign_and_send(
    ledger: &dyn Ledger,
    wallet: &dyn WalletSigner,
    mut transaction: Transaction,
    options: &SendOptions,
) -> BridgeResult<Signature> {
    if transaction.message.recent_blockhash == Hash::default() {
        transaction.message.recent_blockhash = ledger.latest_blockhash().await?;
    }

    let signed = wallet.sign_transaction(transaction).await?;
    if !signed.is_signed() {
        return Err(BridgeError::protocol("Wallet returned an incompletely signed transaction"));
    }

    let signature = ledger.send_transaction(&signed, options.max_retries).await?;
    confirm_transaction(ledger, &signature, options).await?;
    log_info!("chain", "Transaction confirmed", signature = signature);
    Ok(signature)
}

/// Poll until the signature reaches `confirmed`, fails, or the poll budget runs out
pub async fn confirm_transaction(
    ledger: &dyn Ledger,
    signature: &Signature,
    options: &SendOptions,
) -> BridgeResult<()> {
    for attempt in 0..options.poll_limit {
        match ledger.signature_status(signature).await? {
            ConfirmationStatus::Confirmed => return Ok(()),
            ConfirmationStatus::Failed(err) => {
                return Err(BridgeError::chain(format!("Transaction {} failed: {}", signature, err)));
            }
            ConfirmationStatus::Pending => {
                log_debug!("chain", "Awaiting confirmation", signature = signature, attempt = attempt);
                tokio::time::sleep(options.poll_interval).await;
            }
        }
    }
    Err(BridgeError::chain(format!(
        "Transaction {} not confirmed after {} polls",
        signature, options.poll_limit
    )))
}
