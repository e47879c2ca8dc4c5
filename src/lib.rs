//! Collateral Withdraw
//!
//! Client side of a collateral withdrawal: an encrypted deep-link bridge to
//! an external wallet, typed-data digests for the administrator and
//! coordinator roles, and the pipeline that registers the admin signature
//! and sends the withdraw transaction.
//!
//! # Architecture
//!
//! - **bridge**: key exchange, encrypted request URIs, callback correlation
//! - **eip712**: domain-separated withdraw digests
//! - **program**: collateral program instructions, accounts and derived addresses
//! - **chain**: ledger access, signing, broadcast and confirmation
//! - **api**: authorization backend client
//! - **withdrawal**: admin signature submission and the withdrawal orchestrator
//!
//! # Example
//!
//! ```rust,ignore
//! use collateral_withdraw::{BridgeChannel, BridgeWallet, WithdrawalOrchestrator};
//!
//! let wallet = BridgeWallet::connect(channel).await?;
//! let orchestrator = WithdrawalOrchestrator::from_config(WithdrawalConfig::from_env()?)?;
//! let report = orchestrator.withdraw(&wallet, &params).await?;
//! println!("Withdrawal: {}", report.signature);
//! ```

pub mod api;
pub mod bridge;
pub mod chain;
pub mod eip712;
pub mod error;
pub mod program;
pub mod types;
pub mod utils;
pub mod wallet;
pub mod withdrawal;

pub use error::{BridgeError, BridgeResult, ErrorCode};
pub use types::*;

pub use bridge::{BridgeChannel, BridgeWallet, CallbackOutcome, Dispatcher, QueueDispatcher, RequestKind, WalletSession};
pub use eip712::{collateral_withdraw_digest, coordinator_withdraw_digest, TypedDigest, WithdrawMessage};
pub use utils::config::{BridgeConfig, WithdrawalConfig};
pub use utils::logging::{init_tracing, LogFormat};
pub use wallet::{KeypairWallet, WalletSigner};
pub use withdrawal::{SignatureSubmission, WithdrawalOrchestrator, WithdrawalReport, WithdrawalStage};
