//! JSON-RPC backed ledger

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use super::ledger::{ConfirmationStatus, Ledger};
use crate::error::{BridgeError, BridgeResult};
use crate::log_debug;

impl From<ClientError> for BridgeError {
    fn from(e: ClientError) -> Self {
        if let ClientErrorKind::RpcError(RpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
            ..
        }) = e.kind()
        {
            let err = BridgeError::simulation_failed(result.logs.clone().unwrap_or_default());
            return match &result.err {
                Some(cause) => err.with_details(cause.to_string()),
                None => err,
            };
        }
        BridgeError::chain(e.to_string())
    }
}

/// Ledger reached over the cluster's JSON-RPC endpoint at `confirmed` commitment
pub struct RpcLedger {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let commitment = CommitmentConfig::confirmed();
        Self {
            client: RpcClient::new_with_commitment(rpc_url.into(), commitment),
            commitment,
        }
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn get_account(&self, address: &Pubkey) -> BridgeResult<Option<Account>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value)
    }

    async fn latest_blockhash(&self) -> BridgeResult<Hash> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn send_transaction(&self, transaction: &Transaction, max_retries: usize) -> BridgeResult<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            max_retries: Some(max_retries),
            ..RpcSendTransactionConfig::default()
        };
        let signature = self
            .client
            .send_transaction_with_config(transaction, config)
            .await?;
        log_debug!("chain", "Transaction broadcast", signature = signature);
        Ok(signature)
    }

    async fn signature_status(&self, signature: &Signature) -> BridgeResult<ConfirmationStatus> {
        let response = self.client.get_signature_statuses(&[*signature]).await?;
        let status = match response.value.into_iter().next().flatten() {
            None => ConfirmationStatus::Pending,
            Some(status) => match &status.err {
                Some(err) => ConfirmationStatus::Failed(err.to_string()),
                None if status.satisfies_commitment(self.commitment) => ConfirmationStatus::Confirmed,
                None => ConfirmationStatus::Pending,
            },
        };
        Ok(status)
    }
}
