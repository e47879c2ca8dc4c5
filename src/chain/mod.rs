//! Ledger access
//!
//! The pipeline talks to the network only through [`Ledger`], so tests can
//! run it against an in-memory ledger.

pub mod ledger;
pub mod rpc;
pub mod send;

#[cfg(test)]
pub(crate) mod memory;

pub use ledger::{ConfirmationStatus, Ledger};
pub use rpc::RpcLedger;
pub use send::{confirm_transaction, sign_and_send, unsigned_transaction, SendOptions};
