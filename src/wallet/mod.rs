//! Wallet Signer Abstraction
//!
//! The withdrawal pipeline only needs an address and two signing
//! operations. A bridged external wallet and a local keypair both provide
//! them.

mod keypair;

pub use keypair::KeypairWallet;

use async_trait::async_trait;
use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::error::{BridgeError, BridgeResult};

#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address that signs
    fn pubkey(&self) -> Pubkey;

    /// Ed25519 signature over raw message bytes
    async fn sign_message(&self, message: &[u8]) -> BridgeResult<Signature>;

    /// Add this wallet's signature to the transaction. Does not send it.
    async fn sign_transaction(&self, transaction: Transaction) -> BridgeResult<Transaction>;
}

/// Check an Ed25519 signature over `message` against `signer`
pub fn verify_signature(signer: &Pubkey, message: &[u8], signature: &Signature) -> BridgeResult<bool> {
    let verifying_key = VerifyingKey::from_bytes(&signer.to_bytes())
        .map_err(|e| BridgeError::validation(format!("Invalid signer key: {}", e)))?;

    let sig_bytes: [u8; 64] = signature
        .as_ref()
        .try_into()
        .map_err(|_| BridgeError::validation("Invalid signature length"))?;
    let sig = DalekSignature::from_bytes(&sig_bytes);

    Ok(verifying_key.verify(message, &sig).is_ok())
}
