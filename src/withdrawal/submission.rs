//! Administrator signature registration
//!
//! The admin signs the collateral-variant digest; the program stores the
//! signer in a record derived from the message. A signer already on record
//! is never asked to sign again and nothing is written.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::chain::{sign_and_send, unsigned_transaction, Ledger, SendOptions};
use crate::eip712::{collateral_withdraw_digest, struct_hash, WithdrawMessage, WithdrawVariant};
use crate::error::{BridgeError, BridgeResult};
use crate::program::{
    compute_budget_instructions, derive_admin_signatures_address, new_ed25519_verify_instruction,
    submit_signatures, AdminSignaturesAccount, SignatureSubmissionType, SubmitSignaturesAccounts,
    SubmitSignaturesArgs,
};
use crate::types::WithdrawRequest;
use crate::utils::config::ComputeBudget;
use crate::utils::crypto::random_bytes;
use crate::wallet::WalletSigner;
use crate::{log_debug, log_info};

type Lease = Arc<tokio::sync::Mutex<()>>;
type LeaseTable = Mutex<HashMap<Pubkey, Lease>>;

/// Claim on a record's lease; the table entry goes away with its last claim.
struct RecordLease<'a> {
    table: &'a LeaseTable,
    record: Pubkey,
    lease: Lease,
}

impl Drop for RecordLease<'_> {
    fn drop(&mut self) {
        let mut leases = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only handed out under the table lock, so the count is exact here.
        if Arc::strong_count(&self.lease) == 2 {
            leases.remove(&self.record);
        }
    }
}

/// Result of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminRegistration {
    /// Derived admin signature record
    pub record: Pubkey,
    /// Registration transaction, `None` when the signer was already on record
    pub signature: Option<Signature>,
}

impl AdminRegistration {
    pub fn submitted(&self) -> bool {
        self.signature.is_some()
    }
}

pub struct SignatureSubmission {
    ledger: Arc<dyn Ledger>,
    budget: ComputeBudget,
    options: SendOptions,
    leases: LeaseTable,
}

impl SignatureSubmission {
    pub fn new(ledger: Arc<dyn Ledger>, budget: ComputeBudget, options: SendOptions) -> Self {
        Self {
            ledger,
            budget,
            options,
            leases: Mutex::new(HashMap::new()),
        }
    }

    /// Admin record address for `message` under `program_id`
    pub fn compute_address(program_id: &Pubkey, message: &WithdrawMessage) -> BridgeResult<Pubkey> {
        let hash = struct_hash(message, WithdrawVariant::Collateral)?;
        let (address, _bump) = derive_admin_signatures_address(program_id, &message.collateral, &hash);
        Ok(address)
    }

    /// Register the wallet's admin signature for `message` unless it is already on record.
    ///
    /// Calls for the same record are serialized from the record read to
    /// the confirmed write.
    pub async fn submit(
        &self,
        wallet: &dyn WalletSigner,
        program_id: &Pubkey,
        message: &WithdrawMessage,
        request: &WithdrawRequest,
    ) -> BridgeResult<AdminRegistration> {
        let record = Self::compute_address(program_id, message)?;
        let signer = wallet.pubkey();

        let claim = self.lease(&record)?;
        let _held = claim.lease.lock().await;

        if let Some(account) = self.ledger.get_account(&record).await? {
            let existing = AdminSignaturesAccount::decode(&account.data)?;
            if existing.has_signer(&signer) {
                log_info!("withdrawal", "Admin signature already on record", record = record, wallet = signer);
                return Ok(AdminRegistration { record, signature: None });
            }
        }

        let salt = random_bytes::<32>();
        let digest = collateral_withdraw_digest(message, salt)?;
        log_debug!("withdrawal", "Requesting admin signature", digest = hex::encode(digest.final_hash));

        let admin_signature = wallet.sign_message(&digest.final_hash).await?;
        let admin_signature: [u8; 64] = admin_signature
            .as_ref()
            .try_into()
            .map_err(|_| BridgeError::protocol("Wallet returned a malformed signature"))?;

        let verify = new_ed25519_verify_instruction(&signer.to_bytes(), &admin_signature, &digest.final_hash)?;
        let register = submit_signatures(
            program_id,
            &SubmitSignaturesAccounts {
                collateral: message.collateral,
                admin_signatures: record,
                rent_payer: signer,
            },
            &SubmitSignaturesArgs {
                salts: vec![salt],
                target_nonce: message.nonce,
                signature_submission_type: SignatureSubmissionType::withdraw_collateral_asset(
                    &message.sender,
                    &message.receiver,
                    &message.asset,
                    *request,
                ),
            },
        )?;
        let [limit, price] = compute_budget_instructions(&self.budget);

        let transaction = unsigned_transaction(&[limit, price, verify, register], &signer);
        let signature = sign_and_send(self.ledger.as_ref(), wallet, transaction, &self.options).await?;

        log_info!("withdrawal", "Admin signature registered", record = record, signature = signature);
        Ok(AdminRegistration {
            record,
            signature: Some(signature),
        })
    }

    fn lease(&self, record: &Pubkey) -> BridgeResult<RecordLease<'_>> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| BridgeError::internal("Registration lease table poisoned"))?;
        let lease = leases.entry(*record).or_default().clone();
        Ok(RecordLease {
            table: &self.leases,
            record: *record,
            lease,
        })
    }

    #[cfg(test)]
    pub(crate) fn active_leases(&self) -> usize {
        self.leases.lock().map(|leases| leases.len()).unwrap_or_default()
    }
}
