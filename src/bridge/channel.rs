//! Encrypted deep-link channel to an external wallet
//!
//! Outbound requests are URIs of the form `{wallet_base_url}/{operation}?...`
//! carrying base58 parameters. Replies come back as callback URIs
//! `{scheme}://{callbackName}/{correlationId}?...` which the host app hands
//! to [`BridgeChannel::handle_callback`].

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use url::Url;
use zeroize::Zeroizing;

use super::correlator::{PendingResponse, RequestCorrelator};
use super::dispatch::Dispatcher;
use super::keys::{KeyExchangeSession, SharedSecret};
use super::types::{
    params, CallbackOutcome, ConnectData, CorrelationId, DisconnectPayload, RequestKind,
    SignMessagePayload, SignMessageData, SignTransactionData, SignTransactionPayload,
    WalletResponse, WalletSession,
};
use crate::error::{BridgeError, BridgeResult};
use crate::utils::config::BridgeConfig;
use crate::utils::encoding::{decode_base58, decode_transaction_bytes, encode_base58, TextEncoding};
use crate::{log_debug, log_info, log_warn};

#[derive(Default)]
struct ChannelState {
    shared: Option<Arc<SharedSecret>>,
    session: Option<WalletSession>,
}

/// Parameters a wallet callback may carry
#[derive(Debug, Default)]
struct CallbackParams {
    data: Option<String>,
    nonce: Option<String>,
    error_code: Option<String>,
    error_message: Option<String>,
    wallet_public_key: Option<String>,
}

impl CallbackParams {
    fn from_url(url: &Url) -> Self {
        let mut query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        Self {
            data: query.remove(params::DATA),
            nonce: query.remove(params::NONCE),
            error_code: query.remove(params::ERROR_CODE),
            error_message: query.remove(params::ERROR_MESSAGE),
            wallet_public_key: query.remove(params::WALLET_PUBLIC_KEY),
        }
    }

    fn sealed(&self) -> BridgeResult<(&str, &str)> {
        match (self.nonce.as_deref(), self.data.as_deref()) {
            (Some(nonce), Some(data)) => Ok((nonce, data)),
            _ => Err(BridgeError::protocol("Callback is missing nonce or data")),
        }
    }
}

/// One app-to-wallet channel: our keypair, the shared box once connected,
/// and the correlator for in-flight requests.
pub struct BridgeChannel {
    config: BridgeConfig,
    keys: KeyExchangeSession,
    dispatcher: Arc<dyn Dispatcher>,
    correlator: RequestCorrelator,
    state: Mutex<ChannelState>,
}

impl BridgeChannel {
    pub fn new(config: BridgeConfig, dispatcher: Arc<dyn Dispatcher>) -> BridgeResult<Self> {
        config.validate()?;
        let correlator = RequestCorrelator::new(config.response_timeout);
        Ok(Self {
            config,
            keys: KeyExchangeSession::generate(),
            dispatcher,
            correlator,
            state: Mutex::new(ChannelState::default()),
        })
    }

    pub fn public_key_base58(&self) -> String {
        self.keys.public_key_base58()
    }

    /// Current session, if a connect handshake has completed
    pub fn session(&self) -> Option<WalletSession> {
        self.lock_state().ok().and_then(|state| state.session.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.session().is_some()
    }

    fn lock_state(&self) -> BridgeResult<MutexGuard<'_, ChannelState>> {
        self.state
            .lock()
            .map_err(|_| BridgeError::internal("Bridge state lock poisoned"))
    }

    fn shared(&self) -> BridgeResult<Arc<SharedSecret>> {
        self.lock_state()?
            .shared
            .clone()
            .ok_or_else(|| BridgeError::protocol("Missing shared secret: wallet is not connected"))
    }

    fn require_session(&self) -> BridgeResult<WalletSession> {
        self.session()
            .ok_or_else(|| BridgeError::protocol("Wallet is not connected"))
    }

    /// Reject a session snapshot that a reconnect or disconnect has replaced
    fn ensure_active(&self, session: &WalletSession) -> BridgeResult<()> {
        match self.session() {
            Some(current) if current == *session => Ok(()),
            Some(_) => Err(BridgeError::protocol("Wallet session is no longer active")),
            None => Err(BridgeError::protocol("Wallet is not connected")),
        }
    }

    fn redirect_link(&self, kind: RequestKind, id: &CorrelationId) -> String {
        format!("{}://{}/{}", self.config.redirect_scheme, kind.callback_name(), id)
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Build the outbound URI for `kind`.
    ///
    /// Connect carries the cluster and app URL in the clear; every other
    /// kind carries `payload` sealed with the shared box.
    pub fn build_request(
        &self,
        kind: RequestKind,
        payload: Option<&serde_json::Value>,
        id: &CorrelationId,
    ) -> BridgeResult<Url> {
        let sealed = match kind {
            RequestKind::Connect => None,
            _ => {
                let payload = payload.ok_or_else(|| {
                    BridgeError::protocol(format!("{} request requires a payload", kind))
                })?;
                Some(self.shared()?.encrypt_json(payload)?)
            }
        };

        let base = format!("{}/{}", self.config.wallet_base_url.trim_end_matches('/'), kind.path());
        let mut uri = Url::parse(&base)?;
        {
            let mut query = uri.query_pairs_mut();
            query.append_pair(params::DAPP_PUBLIC_KEY, &self.keys.public_key_base58());
            match sealed {
                None => {
                    query.append_pair(params::CLUSTER, self.config.cluster.as_str());
                    query.append_pair(params::APP_URL, &self.config.app_url);
                }
                Some(sealed) => {
                    query.append_pair(params::NONCE, &sealed.nonce);
                    query.append_pair(params::PAYLOAD, &sealed.payload);
                }
            }
            query.append_pair(params::REDIRECT_LINK, &self.redirect_link(kind, id));
        }
        Ok(uri)
    }

    /// Open the slot for `kind` without sending anything
    pub fn await_response(&self, kind: RequestKind) -> BridgeResult<PendingResponse> {
        self.correlator.register(kind)
    }

    /// Register, build and dispatch. The slot is opened before the URI
    /// leaves so a fast callback always finds its waiter.
    pub fn dispatch_request(
        &self,
        kind: RequestKind,
        payload: Option<serde_json::Value>,
    ) -> BridgeResult<PendingResponse> {
        let pending = self.await_response(kind)?;

        let sent = self
            .build_request(kind, payload.as_ref(), pending.id())
            .and_then(|uri| self.dispatcher.dispatch(&uri));
        if let Err(err) = sent {
            self.correlator.cancel(kind, pending.id())?;
            return Err(err);
        }

        log_debug!("bridge", "Wallet request dispatched", kind = kind, correlation = pending.id());
        Ok(pending)
    }

    pub async fn connect(&self) -> BridgeResult<WalletSession> {
        let pending = self.dispatch_request(RequestKind::Connect, None)?;
        match pending.wait().await? {
            WalletResponse::Connected(session) => Ok(session),
            other => Err(unexpected(RequestKind::Connect, &other)),
        }
    }

    pub async fn disconnect(&self) -> BridgeResult<()> {
        let session = self.require_session()?;
        let payload = serde_json::to_value(DisconnectPayload {
            session: session.session.as_str(),
        })?;
        let pending = self.dispatch_request(RequestKind::Disconnect, Some(payload))?;
        match pending.wait().await? {
            WalletResponse::Disconnected => Ok(()),
            other => Err(unexpected(RequestKind::Disconnect, &other)),
        }
    }

    /// Ask the wallet to sign raw message bytes
    pub async fn sign_message(&self, session: &WalletSession, message: &[u8]) -> BridgeResult<Signature> {
        self.ensure_active(session)?;
        let payload = serde_json::to_value(SignMessagePayload {
            message: encode_base58(message),
            session: session.session.as_str(),
            display: "hex",
        })?;
        let pending = self.dispatch_request(RequestKind::SignMessage, Some(payload))?;
        match pending.wait().await? {
            WalletResponse::MessageSigned(signature) => Ok(signature),
            other => Err(unexpected(RequestKind::SignMessage, &other)),
        }
    }

    /// Ask the wallet to sign (not send) a transaction
    pub async fn sign_transaction(
        &self,
        session: &WalletSession,
        transaction: &Transaction,
    ) -> BridgeResult<Transaction> {
        self.ensure_active(session)?;
        let serialized = bincode::serialize(transaction)?;
        let payload = serde_json::to_value(SignTransactionPayload {
            transaction: encode_base58(&serialized),
            session: session.session.as_str(),
            encoding: TextEncoding::Base58,
        })?;
        let pending = self.dispatch_request(RequestKind::SignTransaction, Some(payload))?;
        match pending.wait().await? {
            WalletResponse::TransactionSigned(signed) => Ok(signed),
            other => Err(unexpected(RequestKind::SignTransaction, &other)),
        }
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    /// Route a callback URI to its pending request.
    ///
    /// Failures (wallet error codes, undecryptable data, malformed
    /// payloads) are delivered to the waiter and also returned here.
    /// Callbacks nobody is waiting for are ignored.
    pub fn handle_callback(&self, raw: &str) -> BridgeResult<CallbackOutcome> {
        let url = Url::parse(raw.trim())
            .map_err(|e| BridgeError::protocol(format!("Malformed callback URL: {}", e)))?;
        let route = url.host_str().unwrap_or_default();
        let kind = RequestKind::from_callback_name(route)
            .ok_or_else(|| BridgeError::protocol(format!("Unrecognized callback route: {}", route)))?;
        let id = url
            .path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .map(str::to_string);

        if !self.correlator.check(kind, id.as_deref())? {
            log_warn!("bridge", "Ignoring callback with no pending request", kind = kind);
            return Ok(CallbackOutcome::Unclaimed(kind));
        }

        let params = CallbackParams::from_url(&url);
        match self.process_callback(kind, &params) {
            Ok(response) => {
                self.correlator.resolve(kind, id.as_deref(), Ok(response))?;
                Ok(CallbackOutcome::Delivered(kind))
            }
            Err(err) => {
                log_warn!("bridge", "Wallet callback failed", kind = kind, error = err.message);
                self.correlator.resolve(kind, id.as_deref(), Err(err.clone()))?;
                Err(err)
            }
        }
    }

    fn process_callback(&self, kind: RequestKind, params: &CallbackParams) -> BridgeResult<WalletResponse> {
        if let Some(code) = params.error_code.as_deref() {
            let message = params.error_message.as_deref().unwrap_or("Unknown error");
            return Err(BridgeError::wallet_rejected(code, message));
        }

        match kind {
            RequestKind::Connect => self.adopt_connection(params),
            RequestKind::Disconnect => {
                let mut state = self.lock_state()?;
                state.shared = None;
                state.session = None;
                log_info!("bridge", "Wallet disconnected");
                Ok(WalletResponse::Disconnected)
            }
            RequestKind::SignMessage => {
                let (nonce, data) = params.sealed()?;
                let signed: SignMessageData = self.shared()?.decrypt_json(nonce, data)?;
                let bytes = decode_base58(&signed.signature)
                    .map_err(|e| BridgeError::protocol(e.message))?;
                let signature = Signature::try_from(bytes.as_slice()).map_err(|_| {
                    BridgeError::protocol(format!(
                        "Malformed signature: expected 64 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                Ok(WalletResponse::MessageSigned(signature))
            }
            RequestKind::SignTransaction => {
                let (nonce, data) = params.sealed()?;
                let signed: SignTransactionData = self.shared()?.decrypt_json(nonce, data)?;
                let bytes = decode_transaction_bytes(&signed.transaction, signed.encoding)
                    .map_err(|e| BridgeError::protocol(e.message))?;
                let transaction: Transaction = bincode::deserialize(&bytes).map_err(|e| {
                    BridgeError::protocol(format!("Malformed signed transaction: {}", e))
                })?;
                Ok(WalletResponse::TransactionSigned(transaction))
            }
        }
    }

    /// Complete the handshake: derive the shared box from the wallet's key,
    /// open the session payload and replace any previous connection.
    fn adopt_connection(&self, params: &CallbackParams) -> BridgeResult<WalletResponse> {
        let wallet_key = params.wallet_public_key.as_deref().ok_or_else(|| {
            BridgeError::protocol("Connect callback is missing the wallet encryption key")
        })?;
        let shared = self.keys.derive_shared_base58(wallet_key)?;
        let (nonce, data) = params.sealed()?;
        let connected: ConnectData = shared.decrypt_json(nonce, data)?;

        let wallet = Pubkey::from_str(&connected.public_key)
            .map_err(|_| BridgeError::protocol("Connect payload carries an invalid public key"))?;
        let session = WalletSession {
            wallet,
            session: Zeroizing::new(connected.session),
            peer_public_key: shared.peer_public_key(),
        };

        let mut state = self.lock_state()?;
        state.shared = Some(Arc::new(shared));
        state.session = Some(session.clone());
        drop(state);

        log_info!("bridge", "Wallet connected", wallet = wallet);
        Ok(WalletResponse::Connected(session))
    }
}

fn unexpected(kind: RequestKind, response: &WalletResponse) -> BridgeError {
    BridgeError::protocol(format!("Unexpected reply to {} request: {:?}", kind, response))
}
