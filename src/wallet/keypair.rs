//! Local keypair signer

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

use super::WalletSigner;
use crate::error::{BridgeError, BridgeResult};

/// Signs with a keypair held in process memory
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_message(&self, message: &[u8]) -> BridgeResult<Signature> {
        Ok(self.keypair.sign_message(message))
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> BridgeResult<Transaction> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| BridgeError::validation(format!("Unable to sign transaction: {}", e)))?;
        Ok(transaction)
    }
}
