//! Withdrawal signing pipeline
//!
//! Collects the administrator signature (registered on-chain once per
//! signer) and the backend's coordinator signature, then assembles and
//! sends the withdraw transaction.

mod orchestrator;
mod stage;
mod submission;

#[cfg(test)]
mod tests;

pub use orchestrator::{WithdrawalOrchestrator, WithdrawalReport};
pub use stage::WithdrawalStage;
pub use submission::{AdminRegistration, SignatureSubmission};
