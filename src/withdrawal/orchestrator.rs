//! Withdrawal pipeline
//!
//! FetchAuthorization -> ResolveProgram -> SubmitAdminSignature ->
//! VerifyCoordinatorSignature -> AssembleTransaction -> SignAndSend.
//! Stages run strictly in order; a failure stops the pipeline and is
//! reported once, prefixed with "Withdrawal failed" and tagged with the
//! stage it happened in.

use std::sync::Arc;

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use super::stage::WithdrawalStage;
use super::submission::{AdminRegistration, SignatureSubmission};
use crate::api::{AuthorizationService, HttpAuthorizationService, WithdrawalAuthorization};
use crate::chain::{sign_and_send, unsigned_transaction, Ledger, RpcLedger, SendOptions};
use crate::eip712::{coordinator_withdraw_digest, WithdrawMessage};
use crate::error::{BridgeError, BridgeResult};
use crate::program::{
    associated_token_address, compute_budget_instructions, create_associated_token_account,
    new_ed25519_verify_instruction, verify_ed25519_instruction, withdraw_collateral_asset,
    CollateralAccount, WithdrawAccounts,
};
use crate::types::{WithdrawParams, WithdrawRequest};
use crate::utils::config::WithdrawalConfig;
use crate::wallet::WalletSigner;
use crate::{log_error, log_info};

/// Outcome of a confirmed withdrawal
#[derive(Debug, Clone)]
pub struct WithdrawalReport {
    /// Stages visited, in order, ending with `Confirmed`
    pub stages: Vec<WithdrawalStage>,
    pub admin_record: Pubkey,
    /// Admin registration transaction, if one was needed
    pub registration: Option<Signature>,
    /// Withdraw transaction
    pub signature: Signature,
}

/// On-chain context resolved for a withdrawal
struct ResolvedProgram {
    program_id: Pubkey,
    collateral: CollateralAccount,
}

struct Progress {
    stages: Vec<WithdrawalStage>,
}

impl Progress {
    fn enter(&mut self, stage: WithdrawalStage) {
        log_info!("withdrawal", "Entering stage", stage = stage);
        self.stages.push(stage);
    }

    fn current(&self) -> WithdrawalStage {
        self.stages
            .last()
            .copied()
            .unwrap_or(WithdrawalStage::FetchAuthorization)
    }

    /// Close the run as `Failed`, returning the stage that failed
    fn fail(&mut self) -> WithdrawalStage {
        let stage = self.current();
        self.stages.push(WithdrawalStage::Failed);
        stage
    }
}

pub struct WithdrawalOrchestrator {
    config: WithdrawalConfig,
    authorization: Arc<dyn AuthorizationService>,
    ledger: Arc<dyn Ledger>,
    submission: SignatureSubmission,
}

impl WithdrawalOrchestrator {
    pub fn new(
        config: WithdrawalConfig,
        authorization: Arc<dyn AuthorizationService>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        let submission = SignatureSubmission::new(
            ledger.clone(),
            config.registration_budget,
            SendOptions::from(&config),
        );
        Self {
            config,
            authorization,
            ledger,
            submission,
        }
    }

    /// Backend client and RPC ledger from `config`
    pub fn from_config(config: WithdrawalConfig) -> BridgeResult<Self> {
        config.validate()?;
        let authorization = Arc::new(HttpAuthorizationService::new(&config)?);
        let ledger = Arc::new(RpcLedger::new(config.rpc_url.clone()));
        Ok(Self::new(config, authorization, ledger))
    }

    pub fn submission(&self) -> &SignatureSubmission {
        &self.submission
    }

    /// Run the full pipeline for `params`, signing with `wallet`
    pub async fn withdraw(
        &self,
        wallet: &dyn WalletSigner,
        params: &WithdrawParams,
    ) -> BridgeResult<WithdrawalReport> {
        let mut progress = Progress { stages: Vec::new() };

        match self.run(wallet, params, &mut progress).await {
            Ok(report) => Ok(report),
            Err(err) => {
                let stage = progress.fail();
                log_error!("withdrawal", "Withdrawal failed", stage = stage, error = err.message);
                Err(err
                    .context("Withdrawal failed")
                    .with_details(format!("stage: {}", stage)))
            }
        }
    }

    async fn run(
        &self,
        wallet: &dyn WalletSigner,
        params: &WithdrawParams,
        progress: &mut Progress,
    ) -> BridgeResult<WithdrawalReport> {
        progress.enter(WithdrawalStage::FetchAuthorization);
        params.validate()?;
        self.config.credentials.validate()?;
        let authorization = self.authorization.authorize_withdrawal(params).await?;
        let deposit_authority = self
            .authorization
            .deposit_authority(&authorization.collateral)
            .await?;

        progress.enter(WithdrawalStage::ResolveProgram);
        let resolved = self.resolve_program(&authorization.collateral).await?;

        let sender = wallet.pubkey();
        let request = WithdrawRequest {
            amount_of_asset: authorization.amount,
            signature_expiration_time: authorization.expires_at,
            coordinator_signature_salt: authorization.coordinator_salt,
        };
        let message = WithdrawMessage::new(
            authorization.collateral,
            sender,
            authorization.recipient,
            authorization.asset,
            &request,
            resolved.collateral.admin_funds_nonce,
        );

        progress.enter(WithdrawalStage::SubmitAdminSignature);
        let registration = self
            .submission
            .submit(wallet, &resolved.program_id, &message, &request)
            .await?;

        progress.enter(WithdrawalStage::VerifyCoordinatorSignature);
        let verify = self.coordinator_verification(&message, &resolved.collateral, &authorization)?;

        progress.enter(WithdrawalStage::AssembleTransaction);
        let instructions = self
            .assemble(
                &sender,
                &message,
                &request,
                &resolved,
                &registration,
                &deposit_authority,
                verify,
            )
            .await?;

        progress.enter(WithdrawalStage::SignAndSend);
        let transaction = unsigned_transaction(&instructions, &sender);
        let signature = sign_and_send(
            self.ledger.as_ref(),
            wallet,
            transaction,
            &SendOptions::from(&self.config),
        )
        .await?;

        progress.enter(WithdrawalStage::Confirmed);
        log_info!("withdrawal", "Withdrawal confirmed", signature = signature, collateral = authorization.collateral);
        Ok(WithdrawalReport {
            stages: progress.stages.clone(),
            admin_record: registration.record,
            registration: registration.signature,
            signature,
        })
    }

    async fn resolve_program(&self, collateral: &Pubkey) -> BridgeResult<ResolvedProgram> {
        let account = self.ledger.get_account(collateral).await?.ok_or_else(|| {
            BridgeError::chain(format!(
                "Contract account {} not found in Solana blockchain",
                collateral
            ))
        })?;
        let program_id = account.owner;
        let decoded = CollateralAccount::decode(&account.data)?;
        log_info!("withdrawal", "Resolved collateral program", program = program_id, collateral = collateral);

        Ok(ResolvedProgram {
            program_id,
            collateral: decoded,
        })
    }

    /// Precompile instruction carrying the backend's coordinator signature.
    ///
    /// The signature is checked locally first; a bad one would only fail
    /// later in simulation.
    fn coordinator_verification(
        &self,
        message: &WithdrawMessage,
        collateral: &CollateralAccount,
        authorization: &WithdrawalAuthorization,
    ) -> BridgeResult<Instruction> {
        let digest = coordinator_withdraw_digest(
            message,
            collateral.coordinator,
            authorization.coordinator_salt,
        )?;
        let instruction = new_ed25519_verify_instruction(
            &self.config.coordinator_signer.to_bytes(),
            &authorization.coordinator_signature,
            &digest.final_hash,
        )?;
        if !verify_ed25519_instruction(&instruction)? {
            return Err(BridgeError::authorization("Coordinator signature does not verify"));
        }
        Ok(instruction)
    }

    #[allow(clippy::too_many_arguments)]
    async fn assemble(
        &self,
        sender: &Pubkey,
        message: &WithdrawMessage,
        request: &WithdrawRequest,
        resolved: &ResolvedProgram,
        registration: &AdminRegistration,
        deposit_authority: &Pubkey,
        verify: Instruction,
    ) -> BridgeResult<Vec<Instruction>> {
        let collateral_token_account = associated_token_address(deposit_authority, &message.asset);
        let receiver_token_account = associated_token_address(&message.receiver, &message.asset);

        let [limit, price] = compute_budget_instructions(&self.config.withdrawal_budget);
        let mut instructions = vec![limit, price, verify];

        if self.ledger.get_account(&receiver_token_account).await?.is_none() {
            log_info!("withdrawal", "Creating recipient token account", address = receiver_token_account);
            instructions.push(create_associated_token_account(
                sender,
                &message.receiver,
                &message.asset,
            ));
        }

        instructions.push(withdraw_collateral_asset(
            &resolved.program_id,
            &WithdrawAccounts {
                sender: *sender,
                receiver: message.receiver,
                asset: message.asset,
                collateral_token_account,
                receiver_token_account,
                coordinator: resolved.collateral.coordinator,
                collateral: message.collateral,
                admin_signatures: registration.record,
            },
            request,
        )?);
        Ok(instructions)
    }
}
