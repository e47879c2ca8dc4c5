//! Bridge module tests
//!
//! A simulated wallet plays the other end of the protocol: it opens the
//! app's sealed payloads with its own box and answers through the
//! redirect link, the way a real wallet app would.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

use super::*;
use crate::error::ErrorCode;
use crate::utils::config::BridgeConfig;
use crate::wallet::{verify_signature, WalletSigner};

struct SimulatedWallet {
    signer: Keypair,
    keys: KeyExchangeSession,
    session: String,
}

impl SimulatedWallet {
    fn new() -> Self {
        Self {
            signer: Keypair::new(),
            keys: KeyExchangeSession::generate(),
            session: "session-token-1".to_string(),
        }
    }

    fn respond(&self, uri: &Url) -> String {
        let query: HashMap<String, String> = uri.query_pairs().into_owned().collect();
        let operation = uri.path_segments().unwrap().last().unwrap().to_string();
        let shared = self
            .keys
            .derive_shared_base58(&query[params::DAPP_PUBLIC_KEY])
            .unwrap();
        let mut callback = Url::parse(&query[params::REDIRECT_LINK]).unwrap();

        let reply = match operation.as_str() {
            "connect" => Some(json!({
                "public_key": self.signer.pubkey().to_string(),
                "session": self.session,
            })),
            "signMessage" => {
                let request: Value = shared
                    .decrypt_json(&query[params::NONCE], &query[params::PAYLOAD])
                    .unwrap();
                assert_eq!(request["session"], self.session.as_str());
                assert_eq!(request["display"], "hex");
                let message = bs58::decode(request["message"].as_str().unwrap()).into_vec().unwrap();
                let signature = self.signer.sign_message(&message);
                Some(json!({ "signature": signature.to_string() }))
            }
            "signTransaction" => {
                let request: Value = shared
                    .decrypt_json(&query[params::NONCE], &query[params::PAYLOAD])
                    .unwrap();
                assert_eq!(request["encoding"], "base58");
                let bytes = bs58::decode(request["transaction"].as_str().unwrap()).into_vec().unwrap();
                let mut tx: Transaction = bincode::deserialize(&bytes).unwrap();
                let blockhash = tx.message.recent_blockhash;
                tx.partial_sign(&[&self.signer], blockhash);
                let signed = base64::engine::general_purpose::STANDARD.encode(bincode::serialize(&tx).unwrap());
                Some(json!({ "signed_transaction": signed }))
            }
            _ => None,
        };

        if let Some(reply) = reply {
            let sealed = shared.encrypt_json(&reply).unwrap();
            let mut pairs = callback.query_pairs_mut();
            if operation == "connect" {
                pairs.append_pair(params::WALLET_PUBLIC_KEY, &self.keys.public_key_base58());
            }
            pairs.append_pair(params::NONCE, &sealed.nonce);
            pairs.append_pair(params::DATA, &sealed.payload);
        }
        callback.to_string()
    }
}

fn open_channel(config: BridgeConfig) -> (Arc<BridgeChannel>, UnboundedReceiver<Url>) {
    let (dispatcher, receiver) = QueueDispatcher::new();
    let channel = BridgeChannel::new(config, Arc::new(dispatcher)).unwrap();
    (Arc::new(channel), receiver)
}

/// Drive one request/callback exchange through the simulated wallet
async fn answer(channel: &BridgeChannel, receiver: &mut UnboundedReceiver<Url>, wallet: &SimulatedWallet) {
    let uri = receiver.recv().await.unwrap();
    channel.handle_callback(&wallet.respond(&uri)).unwrap();
}

async fn connected(wallet: &SimulatedWallet) -> (Arc<BridgeChannel>, UnboundedReceiver<Url>, WalletSession) {
    let (channel, mut receiver) = open_channel(BridgeConfig::default());
    let (session, _) = tokio::join!(channel.connect(), answer(&channel, &mut receiver, wallet));
    (channel, receiver, session.unwrap())
}

#[tokio::test]
async fn test_connect_handshake() {
    let wallet = SimulatedWallet::new();
    let (channel, _receiver, session) = connected(&wallet).await;

    assert_eq!(session.wallet, wallet.signer.pubkey());
    assert_eq!(session.session.as_str(), "session-token-1");
    assert_eq!(session.peer_public_key, wallet.keys.public_key());
    assert!(channel.is_connected());
    assert_eq!(channel.session().unwrap().wallet, wallet.signer.pubkey());
}

#[tokio::test]
async fn test_connect_uri_shape() {
    let (channel, mut receiver) = open_channel(BridgeConfig::default());
    let pending = channel.dispatch_request(RequestKind::Connect, None).unwrap();
    let uri = receiver.recv().await.unwrap();

    assert_eq!(uri.scheme(), "https");
    assert_eq!(uri.host_str(), Some("phantom.app"));
    assert_eq!(uri.path(), "/ul/v1/connect");

    let query: HashMap<String, String> = uri.query_pairs().into_owned().collect();
    assert_eq!(query[params::DAPP_PUBLIC_KEY], channel.public_key_base58());
    assert_eq!(query[params::CLUSTER], "devnet");
    assert_eq!(query[params::APP_URL], "https://yourapp.com");
    assert_eq!(
        query[params::REDIRECT_LINK],
        format!("yourapp://onConnected/{}", pending.id())
    );
    assert!(!query.contains_key(params::PAYLOAD));
}

#[tokio::test]
async fn test_sign_message_round_trip() {
    let wallet = SimulatedWallet::new();
    let (channel, mut receiver, session) = connected(&wallet).await;

    let message = b"withdraw 200 units";
    let (signature, _) = tokio::join!(
        channel.sign_message(&session, message),
        answer(&channel, &mut receiver, &wallet)
    );
    let signature = signature.unwrap();
    assert!(verify_signature(&wallet.signer.pubkey(), message, &signature).unwrap());
}

#[tokio::test]
async fn test_sign_transaction_accepts_base64_reply() {
    let wallet = SimulatedWallet::new();
    let (channel, mut receiver, session) = connected(&wallet).await;
    let bridged = BridgeWallet::new(Arc::clone(&channel), session);
    assert_eq!(bridged.pubkey(), wallet.signer.pubkey());

    let payer = wallet.signer.pubkey();
    let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 5);
    let mut tx = Transaction::new_with_payer(&[ix], Some(&payer));
    tx.message.recent_blockhash = Hash::new_unique();

    let (signed, _) = tokio::join!(
        bridged.sign_transaction(tx.clone()),
        answer(&channel, &mut receiver, &wallet)
    );
    let signed = signed.unwrap();
    assert_eq!(signed.message, tx.message);
    assert!(signed.verify().is_ok());
}

#[tokio::test]
async fn test_error_code_fails_pending_request() {
    let (channel, _receiver) = open_channel(BridgeConfig::default());
    let pending = channel.dispatch_request(RequestKind::Connect, None).unwrap();

    // Route matching ignores case
    let callback = format!(
        "yourapp://ONCONNECTED/{}?errorCode=4001&errorMessage=User%20rejected%20the%20request.",
        pending.id()
    );
    let err = channel.handle_callback(&callback).unwrap_err();
    assert_eq!(err.code, ErrorCode::WalletRejected);

    let err = pending.wait().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::WalletRejected);
    assert_eq!(err.message, "Wallet returned error 4001: User rejected the request.");
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn test_stale_callback_is_rejected() {
    let wallet = SimulatedWallet::new();
    let (channel, mut receiver) = open_channel(BridgeConfig::default());
    let pending = channel.dispatch_request(RequestKind::Connect, None).unwrap();
    let uri = receiver.recv().await.unwrap();
    let callback = wallet.respond(&uri);

    let stale = callback.replace(pending.id().as_str(), "0000");
    let err = channel.handle_callback(&stale).unwrap_err();
    assert_eq!(err.code, ErrorCode::Protocol);
    assert!(!channel.is_connected());

    assert_eq!(
        channel.handle_callback(&callback).unwrap(),
        CallbackOutcome::Delivered(RequestKind::Connect)
    );
    assert!(pending.wait().await.is_ok());
}

#[tokio::test]
async fn test_second_request_supersedes_first() {
    let (channel, _receiver) = open_channel(BridgeConfig::default());
    let first = channel.dispatch_request(RequestKind::Connect, None).unwrap();
    let _second = channel.dispatch_request(RequestKind::Connect, None).unwrap();

    let err = first.wait().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Superseded);
}

#[tokio::test]
async fn test_undecryptable_reply_fails_waiter() {
    let wallet = SimulatedWallet::new();
    let (channel, mut receiver, _session) = connected(&wallet).await;

    let pending = channel
        .dispatch_request(RequestKind::SignMessage, Some(json!({ "message": "x" })))
        .unwrap();
    let _ = receiver.recv().await.unwrap();

    let callback = format!(
        "yourapp://onMessageSigned/{}?nonce={}&data={}",
        pending.id(),
        bs58::encode([3u8; 24]).into_string(),
        bs58::encode([4u8; 48]).into_string()
    );
    let err = channel.handle_callback(&callback).unwrap_err();
    assert!(err.is_protocol());
    assert_eq!(err.message, "Unable to decrypt data");

    let err = pending.wait().await.unwrap_err();
    assert_eq!(err.message, "Unable to decrypt data");
}

#[tokio::test]
async fn test_disconnect_ends_session() {
    let wallet = SimulatedWallet::new();
    let (channel, mut receiver, session) = connected(&wallet).await;

    let (result, _) = tokio::join!(channel.disconnect(), answer(&channel, &mut receiver, &wallet));
    result.unwrap();
    assert!(!channel.is_connected());

    let err = channel.sign_message(&session, b"late").await.unwrap_err();
    assert!(err.is_protocol());
}

#[tokio::test]
async fn test_requests_need_a_connection() {
    let (channel, _receiver) = open_channel(BridgeConfig::default());
    let err = channel
        .dispatch_request(RequestKind::SignMessage, Some(json!({ "message": "x" })))
        .err()
        .unwrap();
    assert!(err.is_protocol());
    assert!(err.message.contains("Missing shared secret"));
}

#[test]
fn test_unclaimed_and_unknown_callbacks() {
    let (channel, _receiver) = open_channel(BridgeConfig::default());

    assert_eq!(
        channel.handle_callback("yourapp://onMessageSigned/abc").unwrap(),
        CallbackOutcome::Unclaimed(RequestKind::SignMessage)
    );
    assert!(channel.handle_callback("yourapp://onSomethingElse/abc").unwrap_err().is_protocol());
    assert!(channel.handle_callback("not a url").unwrap_err().is_protocol());
}

#[tokio::test]
async fn test_response_timeout() {
    let config = BridgeConfig {
        response_timeout: Some(Duration::from_millis(20)),
        ..BridgeConfig::default()
    };
    let (channel, _receiver) = open_channel(config);

    let err = channel.connect().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::Timeout);
}
