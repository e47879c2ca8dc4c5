//! Withdrawal pipeline stages

use std::fmt;

/// Where a withdrawal is, or where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WithdrawalStage {
    FetchAuthorization,
    ResolveProgram,
    SubmitAdminSignature,
    VerifyCoordinatorSignature,
    AssembleTransaction,
    SignAndSend,
    Confirmed,
    Failed,
}

impl WithdrawalStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStage::FetchAuthorization => "fetch_authorization",
            WithdrawalStage::ResolveProgram => "resolve_program",
            WithdrawalStage::SubmitAdminSignature => "submit_admin_signature",
            WithdrawalStage::VerifyCoordinatorSignature => "verify_coordinator_signature",
            WithdrawalStage::AssembleTransaction => "assemble_transaction",
            WithdrawalStage::SignAndSend => "sign_and_send",
            WithdrawalStage::Confirmed => "confirmed",
            WithdrawalStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStage::Confirmed | WithdrawalStage::Failed)
    }
}

impl fmt::Display for WithdrawalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
