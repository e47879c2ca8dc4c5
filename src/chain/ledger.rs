//! Ledger abstraction

use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::BridgeResult;

/// Where a submitted transaction stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Unknown to the cluster or below the target commitment
    Pending,
    Confirmed,
    /// Landed with an execution error
    Failed(String),
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// `None` when the account does not exist
    async fn get_account(&self, address: &Pubkey) -> BridgeResult<Option<Account>>;

    async fn latest_blockhash(&self) -> BridgeResult<Hash>;

    /// Simulate then broadcast. `max_retries` bounds transport-level resends of
    /// the same signed bytes. A failed simulation is a `Simulation` error
    /// carrying the program logs.
    async fn send_transaction(&self, transaction: &Transaction, max_retries: usize) -> BridgeResult<Signature>;

    async fn signature_status(&self, signature: &Signature) -> BridgeResult<ConfirmationStatus>;
}
