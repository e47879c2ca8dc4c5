//! External wallet reached over the bridge

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use super::channel::BridgeChannel;
use super::types::WalletSession;
use crate::error::BridgeResult;
use crate::wallet::WalletSigner;

/// [`WalletSigner`] bound to one connected session
#[derive(Clone)]
pub struct BridgeWallet {
    channel: Arc<BridgeChannel>,
    session: WalletSession,
}

impl BridgeWallet {
    pub fn new(channel: Arc<BridgeChannel>, session: WalletSession) -> Self {
        Self { channel, session }
    }

    /// Run the connect handshake and bind to the resulting session
    pub async fn connect(channel: Arc<BridgeChannel>) -> BridgeResult<Self> {
        let session = channel.connect().await?;
        Ok(Self::new(channel, session))
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }
}

#[async_trait]
impl WalletSigner for BridgeWallet {
    fn pubkey(&self) -> Pubkey {
        self.session.wallet
    }

    async fn sign_message(&self, message: &[u8]) -> BridgeResult<Signature> {
        self.channel.sign_message(&self.session, message).await
    }

    async fn sign_transaction(&self, transaction: Transaction) -> BridgeResult<Transaction> {
        self.channel.sign_transaction(&self.session, &transaction).await
    }
}
