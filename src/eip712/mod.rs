//! Typed-Data Withdrawal Digests
//!
//! Domain-separated digests for the two withdrawal authorization roles,
//! byte-compatible with the collateral program's verifier.
//!
//! # Example
//! ```rust,ignore
//! use collateral_withdraw::eip712::{WithdrawMessage, collateral_withdraw_digest};
//!
//! let message = WithdrawMessage::new(collateral, sender, receiver, asset, &request, nonce);
//! let digest = collateral_withdraw_digest(&message, salt)?;
//! wallet.sign_message(&digest.final_hash).await?;
//! ```

pub mod types;
pub mod encoder;
pub mod hasher;

pub use types::*;
pub use encoder::*;
pub use hasher::*;
