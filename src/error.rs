//! Error taxonomy for the SafeFlow client core
//!
//! Codec and guard errors are surfaced immediately and block submission.
//! Network errors on reads are recovered locally; on writes they are
//! surfaced as retryable. The ledger's own enforcement remains the
//! authoritative check for every guarded operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SafeFlowError {
    /// Amount string could not be parsed into 6-decimal micro units
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Address failed structural validation or c32 decoding
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Caller is not permitted to perform the requested operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Stream status does not allow the requested operation
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Claim or create requested against insufficient funds
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    /// All fallback endpoints failed
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// Caller declined to authorize a write
    #[error("user rejected: {0}")]
    UserRejected(String),

    /// Ledger write rejected for caller-facing reasons
    #[error("transfer failed: {0}")]
    TransferFailed(String),
}

pub type Result<T> = std::result::Result<T, SafeFlowError>;

/// Classify a raw ledger/wallet write error into the user-facing taxonomy.
///
/// Write failures are terminal for that attempt; classification only drives
/// messaging (rejected vs. insufficient vs. gas-related), never auto-retry.
pub fn classify_write_error(raw: &str) -> SafeFlowError {
    let lower = raw.to_lowercase();

    if lower.contains("rejected")
        || lower.contains("cancelled by user")
        || lower.contains("user denied")
        || lower.contains("declined")
    {
        return SafeFlowError::UserRejected(raw.to_string());
    }

    if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
        return SafeFlowError::InsufficientBalance(raw.to_string());
    }

    if lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("503")
        || lower.contains("502")
    {
        return SafeFlowError::NetworkUnavailable(raw.to_string());
    }

    if lower.contains("fee") || lower.contains("gas") {
        return SafeFlowError::TransferFailed(format!("gas/fee related: {}", raw));
    }

    SafeFlowError::TransferFailed(raw.to_string())
}
