//! Collateral program interface
//!
//! Address derivation, Anchor-style instruction and account codecs, the
//! Ed25519 verification precompile and associated token accounts.

pub mod accounts;
pub mod ed25519;
pub mod instructions;
pub mod pda;
pub mod token;

pub use accounts::{AdminSignaturesAccount, CollateralAccount};
pub use ed25519::{new_ed25519_verify_instruction, verify_ed25519_instruction};
pub use instructions::*;
pub use pda::derive_admin_signatures_address;
pub use token::{associated_token_address, create_associated_token_account};
