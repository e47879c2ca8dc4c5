//! In-memory ledger for tests
//!
//! Verifies transaction and Ed25519 precompile signatures, applies admin
//! signature registrations to its account map, and can be told to fail the
//! next simulation or to never confirm.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::ed25519_program;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use super::ledger::{ConfirmationStatus, Ledger};
use crate::error::{BridgeError, BridgeResult};
use crate::program::accounts::AdminSignaturesAccount;
use crate::program::ed25519::verify_ed25519_instruction;
use crate::program::instructions::{instruction_discriminator, SUBMIT_SIGNATURES};

#[derive(Default)]
struct State {
    accounts: HashMap<Pubkey, Account>,
    sent: Vec<Transaction>,
    fail_next: Option<Vec<String>>,
    hold: bool,
    reads: usize,
}

pub(crate) struct InMemoryLedger {
    state: Mutex<State>,
    blockhash: Hash,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            blockhash: Hash::new_unique(),
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn set_account(&self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        let account = Account {
            lamports: 1_000_000,
            data,
            owner,
            executable: false,
            rent_epoch: 0,
        };
        self.state.lock().unwrap().accounts.insert(address, account);
    }

    pub fn account_data(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.state.lock().unwrap().accounts.get(address).map(|a| a.data.clone())
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Ledger calls made so far (reads and sends)
    pub fn interactions(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.reads + state.sent.len()
    }

    pub fn fail_next_send(&self, logs: Vec<String>) {
        self.state.lock().unwrap().fail_next = Some(logs);
    }

    pub fn hold_confirmations(&self) {
        self.state.lock().unwrap().hold = true;
    }

    fn register_admin_signatures(state: &mut State, transaction: &Transaction) {
        let discriminator = instruction_discriminator(SUBMIT_SIGNATURES);
        for ix in transaction.message.instructions.iter() {
            if !ix.data.starts_with(&discriminator) {
                continue;
            }
            let keys = &transaction.message.account_keys;
            let program_id = keys[ix.program_id_index as usize];
            let record = keys[ix.accounts[1] as usize];
            let signer = keys[ix.accounts[2] as usize];

            let mut account = state
                .accounts
                .get(&record)
                .and_then(|a| AdminSignaturesAccount::decode(&a.data).ok())
                .unwrap_or_default();
            account.signers.push(signer);

            state.accounts.insert(
                record,
                Account {
                    lamports: 1,
                    data: account.encode().unwrap(),
                    owner: program_id,
                    executable: false,
                    rent_epoch: 0,
                },
            );
        }
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn get_account(&self, address: &Pubkey) -> BridgeResult<Option<Account>> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        Ok(state.accounts.get(address).cloned())
    }

    async fn latest_blockhash(&self) -> BridgeResult<Hash> {
        self.state.lock().unwrap().reads += 1;
        Ok(self.blockhash)
    }

    async fn send_transaction(&self, transaction: &Transaction, _max_retries: usize) -> BridgeResult<Signature> {
        if transaction.verify().is_err() {
            return Err(BridgeError::chain("Transaction signature verification failure"));
        }
        for ix in transaction.message.instructions.iter() {
            let program_id = transaction.message.account_keys[ix.program_id_index as usize];
            if program_id == ed25519_program::ID {
                let decompiled = solana_sdk::instruction::Instruction {
                    program_id,
                    accounts: vec![],
                    data: ix.data.clone(),
                };
                if !verify_ed25519_instruction(&decompiled)? {
                    return Err(BridgeError::simulation_failed(vec![format!(
                        "Program {} failed: custom program error: 0x2",
                        ed25519_program::ID
                    )]));
                }
            }
        }

        let mut state = self.state.lock().unwrap();
        if let Some(logs) = state.fail_next.take() {
            return Err(BridgeError::simulation_failed(logs));
        }
        Self::register_admin_signatures(&mut state, transaction);
        state.sent.push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn signature_status(&self, signature: &Signature) -> BridgeResult<ConfirmationStatus> {
        let state = self.state.lock().unwrap();
        if !state.hold && state.sent.iter().any(|tx| tx.signatures[0] == *signature) {
            Ok(ConfirmationStatus::Confirmed)
        } else {
            Ok(ConfirmationStatus::Pending)
        }
    }
}
