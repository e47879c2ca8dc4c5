use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use solana_sdk::ed25519_program;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

use super::*;
use crate::api::{
    parse_withdrawal_response, select_deposit_authority, AuthorizationService, DepositResponse,
    WithdrawalAuthorization, WithdrawalResponse,
};
use crate::chain::memory::InMemoryLedger;
use crate::chain::{Ledger, SendOptions};
use crate::eip712::{coordinator_withdraw_digest, WithdrawMessage};
use crate::error::{BridgeResult, ErrorCode};
use crate::program::token::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::program::{associated_token_address, compute_budget_instructions, AdminSignaturesAccount, CollateralAccount};
use crate::types::{WithdrawParams, WithdrawRequest};
use crate::utils::config::{ApiCredentials, WithdrawalConfig};
use crate::wallet::{KeypairWallet, WalletSigner};

const ADMIN_FUNDS_NONCE: u32 = 7;
const COORDINATOR_SALT: [u8; 32] = [9u8; 32];

/// Backend fake answering with canned JSON, parsed like the real client
struct CannedAuthorization {
    withdrawal: Value,
    deposits: Value,
    calls: AtomicUsize,
}

#[async_trait]
impl AuthorizationService for CannedAuthorization {
    async fn authorize_withdrawal(&self, _params: &WithdrawParams) -> BridgeResult<WithdrawalAuthorization> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response: WithdrawalResponse = serde_json::from_value(self.withdrawal.clone())?;
        parse_withdrawal_response(&response)
    }

    async fn deposit_authority(&self, collateral: &Pubkey) -> BridgeResult<Pubkey> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response: DepositResponse = serde_json::from_value(self.deposits.clone())?;
        select_deposit_authority(&response, collateral)
    }
}

/// Keypair wallet that counts message signing requests
struct CountingWallet {
    inner: KeypairWallet,
    message_signs: AtomicUsize,
}

impl CountingWallet {
    fn signs(&self) -> usize {
        self.message_signs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSigner for CountingWallet {
    fn pubkey(&self) -> Pubkey {
        self.inner.pubkey()
    }

    async fn sign_message(&self, message: &[u8]) -> BridgeResult<Signature> {
        self.message_signs.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_message(message).await
    }

    async fn sign_transaction(&self, transaction: Transaction) -> BridgeResult<Transaction> {
        self.inner.sign_transaction(transaction).await
    }
}

struct Fixture {
    ledger: Arc<InMemoryLedger>,
    wallet: CountingWallet,
    coordinator_signer: Keypair,
    program_id: Pubkey,
    collateral: Pubkey,
    coordinator: Pubkey,
    asset: Pubkey,
    recipient: Pubkey,
    deposit_authority: Pubkey,
    request: WithdrawRequest,
    config: WithdrawalConfig,
}

impl Fixture {
    fn new() -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let coordinator_signer = Keypair::new();
        let program_id = Pubkey::new_unique();
        let collateral = Pubkey::new_unique();
        let coordinator = Pubkey::new_unique();

        let account = CollateralAccount {
            coordinator,
            admin_funds_nonce: ADMIN_FUNDS_NONCE,
        };
        ledger.set_account(collateral, program_id, account.encode().unwrap());

        let config = WithdrawalConfig {
            credentials: ApiCredentials {
                partner_code: "partner".to_string(),
                app_code: "app".to_string(),
                app_version: "2.8.0".to_string(),
                auth_token: "token".to_string(),
            },
            coordinator_signer: coordinator_signer.pubkey(),
            poll_interval: Duration::from_millis(1),
            poll_limit: 5,
            ..WithdrawalConfig::default()
        };

        Self {
            ledger,
            wallet: CountingWallet {
                inner: KeypairWallet::new(Keypair::new()),
                message_signs: AtomicUsize::new(0),
            },
            coordinator_signer,
            program_id,
            collateral,
            coordinator,
            asset: Pubkey::new_unique(),
            recipient: Pubkey::new_unique(),
            deposit_authority: Pubkey::new_unique(),
            request: WithdrawRequest {
                amount_of_asset: 200,
                signature_expiration_time: 1_760_000_000,
                coordinator_signature_salt: COORDINATOR_SALT,
            },
            config,
        }
    }

    fn admin(&self) -> Pubkey {
        self.wallet.pubkey()
    }

    fn message(&self) -> WithdrawMessage {
        WithdrawMessage::new(
            self.collateral,
            self.admin(),
            self.recipient,
            self.asset,
            &self.request,
            ADMIN_FUNDS_NONCE,
        )
    }

    fn admin_record(&self) -> Pubkey {
        SignatureSubmission::compute_address(&self.program_id, &self.message()).unwrap()
    }

    fn coordinator_signature(&self) -> Vec<u8> {
        let digest = coordinator_withdraw_digest(&self.message(), self.coordinator, COORDINATOR_SALT).unwrap();
        self.coordinator_signer.sign_message(&digest.final_hash).as_ref().to_vec()
    }

    fn authorization(&self, status: &str, signature: Vec<u8>) -> Value {
        json!({
            "status": status,
            "parameters": [
                self.collateral.to_string(),
                self.asset.to_string(),
                self.request.amount_of_asset,
                self.recipient.to_string(),
                self.request.signature_expiration_time,
                COORDINATOR_SALT.to_vec(),
                STANDARD.encode(signature),
            ],
        })
    }

    fn backend(&self, withdrawal: Value) -> Arc<CannedAuthorization> {
        Arc::new(CannedAuthorization {
            withdrawal,
            deposits: json!({
                "deposits": [{
                    "proxyAddress": self.collateral.to_string(),
                    "depositAddress": self.deposit_authority.to_string(),
                }]
            }),
            calls: AtomicUsize::new(0),
        })
    }

    fn orchestrator(&self, backend: Arc<CannedAuthorization>) -> WithdrawalOrchestrator {
        let ledger: Arc<dyn Ledger> = self.ledger.clone();
        WithdrawalOrchestrator::new(self.config.clone(), backend, ledger)
    }

    fn approved(&self) -> WithdrawalOrchestrator {
        self.orchestrator(self.backend(self.authorization("completed", self.coordinator_signature())))
    }

    fn register_admin(&self, signers: Vec<Pubkey>) {
        let record = AdminSignaturesAccount { signers };
        self.ledger
            .set_account(self.admin_record(), self.program_id, record.encode().unwrap());
    }

    fn submission(&self) -> SignatureSubmission {
        let ledger: Arc<dyn Ledger> = self.ledger.clone();
        SignatureSubmission::new(ledger, self.config.registration_budget, SendOptions::from(&self.config))
    }
}

fn params() -> WithdrawParams {
    WithdrawParams {
        token: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".to_string(),
        amount: "2".to_string(),
        recipient_address: "8pyuGBnfbCADScManuTtA23mjXmJDbzpgPw2R8tmC6gz".to_string(),
        chain_id: 901,
    }
}

fn program_ids(transaction: &Transaction) -> Vec<Pubkey> {
    let keys = &transaction.message.account_keys;
    transaction
        .message
        .instructions
        .iter()
        .map(|ix| keys[ix.program_id_index as usize])
        .collect()
}

#[tokio::test]
async fn test_full_withdrawal_registers_admin_signature() {
    let fixture = Fixture::new();
    let report = fixture.approved().withdraw(&fixture.wallet, &params()).await.unwrap();

    assert_eq!(
        report.stages,
        vec![
            WithdrawalStage::FetchAuthorization,
            WithdrawalStage::ResolveProgram,
            WithdrawalStage::SubmitAdminSignature,
            WithdrawalStage::VerifyCoordinatorSignature,
            WithdrawalStage::AssembleTransaction,
            WithdrawalStage::SignAndSend,
            WithdrawalStage::Confirmed,
        ]
    );
    assert_eq!(report.admin_record, fixture.admin_record());

    let sent = fixture.ledger.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(report.registration, Some(sent[0].signatures[0]));
    assert_eq!(report.signature, sent[1].signatures[0]);

    let budget = compute_budget_instructions(&fixture.config.registration_budget);
    assert_eq!(
        program_ids(&sent[0]),
        vec![budget[0].program_id, budget[1].program_id, ed25519_program::ID, fixture.program_id]
    );
    assert_eq!(sent[0].message.instructions[0].data, budget[0].data);
    assert_eq!(sent[0].message.instructions[1].data, budget[1].data);

    let record = fixture.ledger.account_data(&fixture.admin_record()).unwrap();
    assert!(AdminSignaturesAccount::decode(&record).unwrap().has_signer(&fixture.admin()));
}

#[tokio::test]
async fn test_pending_authorization_touches_no_ledger() {
    let fixture = Fixture::new();
    let orchestrator = fixture.orchestrator(fixture.backend(fixture.authorization("pending", vec![])));

    let err = orchestrator.withdraw(&fixture.wallet, &params()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Authorization);
    assert_eq!(err.message, "Withdrawal failed: Signature is not ready: pending");
    assert_eq!(err.details.as_deref(), Some("stage: fetch_authorization"));
    assert_eq!(fixture.ledger.interactions(), 0);
}

#[tokio::test]
async fn test_signer_on_record_skips_registration() {
    let fixture = Fixture::new();
    fixture.register_admin(vec![fixture.admin()]);

    let report = fixture.approved().withdraw(&fixture.wallet, &params()).await.unwrap();
    assert_eq!(report.registration, None);
    assert_eq!(fixture.wallet.signs(), 0);

    let sent = fixture.ledger.sent();
    assert_eq!(sent.len(), 1);

    let budget = compute_budget_instructions(&fixture.config.withdrawal_budget);
    assert_eq!(
        program_ids(&sent[0]),
        vec![
            budget[0].program_id,
            budget[1].program_id,
            ed25519_program::ID,
            ASSOCIATED_TOKEN_PROGRAM_ID,
            fixture.program_id,
        ]
    );
    assert_eq!(sent[0].message.instructions[0].data, budget[0].data);
    assert_eq!(sent[0].message.instructions[1].data, budget[1].data);
}

#[tokio::test]
async fn test_existing_recipient_token_account_not_recreated() {
    let fixture = Fixture::new();
    fixture.register_admin(vec![fixture.admin()]);
    let receiver_ata = associated_token_address(&fixture.recipient, &fixture.asset);
    fixture.ledger.set_account(receiver_ata, TOKEN_PROGRAM_ID, vec![0u8; 165]);

    fixture.approved().withdraw(&fixture.wallet, &params()).await.unwrap();

    let sent = fixture.ledger.sent();
    let programs = program_ids(&sent[0]);
    assert_eq!(programs.len(), 4);
    assert!(!programs.contains(&ASSOCIATED_TOKEN_PROGRAM_ID));
    assert_eq!(programs[3], fixture.program_id);
}

#[tokio::test]
async fn test_simulation_logs_reported_in_order() {
    let fixture = Fixture::new();
    fixture.register_admin(vec![fixture.admin()]);
    let logs = vec![
        "Program log: Instruction: WithdrawCollateralAsset".to_string(),
        "Program log: AnchorError caused by account: collateral_admin_signatures".to_string(),
        "Program log: Error Message: Not enough signatures.".to_string(),
    ];
    fixture.ledger.fail_next_send(logs.clone());

    let err = fixture
        .approved()
        .withdraw(&fixture.wallet, &params())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::Simulation);
    assert_eq!(
        err.message,
        format!("Withdrawal failed: Simulation failed:\n{}", logs.join("\n"))
    );
    assert_eq!(err.logs, logs);
    assert_eq!(err.details.as_deref(), Some("stage: sign_and_send"));
}

#[tokio::test]
async fn test_bad_coordinator_signature_rejected_locally() {
    let fixture = Fixture::new();
    fixture.register_admin(vec![fixture.admin()]);
    let forged = fixture.coordinator_signer.sign_message(b"something else").as_ref().to_vec();
    let orchestrator = fixture.orchestrator(fixture.backend(fixture.authorization("completed", forged)));

    let err = orchestrator.withdraw(&fixture.wallet, &params()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Authorization);
    assert_eq!(err.message, "Withdrawal failed: Coordinator signature does not verify");
    assert_eq!(err.details.as_deref(), Some("stage: verify_coordinator_signature"));
    assert!(fixture.ledger.sent().is_empty());
}

#[tokio::test]
async fn test_missing_contract_account() {
    let mut fixture = Fixture::new();
    fixture.collateral = Pubkey::new_unique();

    let err = fixture
        .approved()
        .withdraw(&fixture.wallet, &params())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Chain);
    assert_eq!(
        err.message,
        format!(
            "Withdrawal failed: Contract account {} not found in Solana blockchain",
            fixture.collateral
        )
    );
    assert_eq!(err.details.as_deref(), Some("stage: resolve_program"));
}

#[tokio::test]
async fn test_missing_credentials_fail_before_network() {
    let mut fixture = Fixture::new();
    fixture.config.credentials.auth_token.clear();
    let backend = fixture.backend(fixture.authorization("completed", fixture.coordinator_signature()));
    let orchestrator = fixture.orchestrator(backend.clone());

    let err = orchestrator.withdraw(&fixture.wallet, &params()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Validation);
    assert_eq!(err.message, "Withdrawal failed: Missing required project API credentials");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.ledger.interactions(), 0);
}

#[tokio::test]
async fn test_second_submission_writes_nothing() {
    let fixture = Fixture::new();
    let submission = fixture.submission();
    let message = fixture.message();

    let first = submission
        .submit(&fixture.wallet, &fixture.program_id, &message, &fixture.request)
        .await
        .unwrap();
    assert!(first.submitted());
    assert_eq!(fixture.ledger.sent().len(), 1);
    assert_eq!(fixture.wallet.signs(), 1);

    let second = submission
        .submit(&fixture.wallet, &fixture.program_id, &message, &fixture.request)
        .await
        .unwrap();
    assert!(!second.submitted());
    assert_eq!(second.record, first.record);
    assert_eq!(fixture.ledger.sent().len(), 1);
    assert_eq!(fixture.wallet.signs(), 1);
    assert_eq!(submission.active_leases(), 0);
}

#[tokio::test]
async fn test_record_without_this_signer_registers() {
    let fixture = Fixture::new();
    let other_admin = Pubkey::new_unique();
    fixture.register_admin(vec![other_admin]);

    let registration = fixture
        .submission()
        .submit(&fixture.wallet, &fixture.program_id, &fixture.message(), &fixture.request)
        .await
        .unwrap();
    assert!(registration.submitted());

    let record = fixture.ledger.account_data(&registration.record).unwrap();
    let signers = AdminSignaturesAccount::decode(&record).unwrap().signers;
    assert_eq!(signers, vec![other_admin, fixture.admin()]);
}

#[tokio::test]
async fn test_concurrent_submissions_register_once() {
    let fixture = Fixture::new();
    let submission = fixture.submission();
    let message = fixture.message();

    let (a, b) = tokio::join!(
        submission.submit(&fixture.wallet, &fixture.program_id, &message, &fixture.request),
        submission.submit(&fixture.wallet, &fixture.program_id, &message, &fixture.request),
    );
    let submitted = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|r| r.submitted())
        .count();

    assert_eq!(submitted, 1);
    assert_eq!(fixture.ledger.sent().len(), 1);
    assert_eq!(fixture.wallet.signs(), 1);
    assert_eq!(submission.active_leases(), 0);
}

#[tokio::test]
async fn test_signer_on_record_is_never_asked_to_sign() {
    let fixture = Fixture::new();
    fixture.register_admin(vec![fixture.admin()]);

    let registration = fixture
        .submission()
        .submit(&fixture.wallet, &fixture.program_id, &fixture.message(), &fixture.request)
        .await
        .unwrap();
    assert!(!registration.submitted());
    assert_eq!(fixture.wallet.signs(), 0);
    assert!(fixture.ledger.sent().is_empty());
}

#[tokio::test]
async fn test_leases_released_across_records() {
    let mut fixture = Fixture::new();
    let submission = fixture.submission();

    let mut records = Vec::new();
    for amount in [100u64, 200, 300] {
        fixture.request.amount_of_asset = amount;
        let registration = submission
            .submit(&fixture.wallet, &fixture.program_id, &fixture.message(), &fixture.request)
            .await
            .unwrap();
        records.push(registration.record);
    }

    records.sort();
    records.dedup();
    assert_eq!(records.len(), 3);
    assert_eq!(submission.active_leases(), 0);
}

#[tokio::test]
async fn test_lease_released_when_registration_fails() {
    let fixture = Fixture::new();
    let submission = fixture.submission();
    fixture
        .ledger
        .fail_next_send(vec!["Program log: Error Message: Rent payer underfunded.".to_string()]);

    let err = submission
        .submit(&fixture.wallet, &fixture.program_id, &fixture.message(), &fixture.request)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Simulation);
    assert_eq!(submission.active_leases(), 0);

    let retry = submission
        .submit(&fixture.wallet, &fixture.program_id, &fixture.message(), &fixture.request)
        .await
        .unwrap();
    assert!(retry.submitted());
    assert_eq!(submission.active_leases(), 0);
}
