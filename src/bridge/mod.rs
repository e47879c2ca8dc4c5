//! Wallet bridge
//!
//! Deep-link protocol to an external wallet: key exchange, encrypted
//! request URIs, and correlation of the callbacks that come back.

pub mod channel;
pub mod correlator;
pub mod dispatch;
pub mod keys;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use channel::BridgeChannel;
pub use correlator::{PendingResponse, RequestCorrelator};
pub use dispatch::{Dispatcher, QueueDispatcher};
pub use keys::{EncryptedPayload, KeyExchangeSession, SharedSecret};
pub use types::*;
pub use wallet::BridgeWallet;
