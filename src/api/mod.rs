//! Authorization backend
//!
//! The backend decides whether a withdrawal may happen and returns the
//! coordinator's signature over it, plus the deposit authority that owns
//! the collateral's token account.

mod client;
mod parse;
pub mod types;

pub use client::{parse_amount, AuthorizationService, HttpAuthorizationService};
pub use parse::{parse_withdrawal_response, select_deposit_authority};
pub use types::*;
