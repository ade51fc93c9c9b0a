//! Chain-specific types and error definitions.

use alloy::primitives::TxHash;
use thiserror::Error;

// Re-export NetworkConfig from config module to avoid duplication
pub use crate::config::schema::NetworkConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Why a node refused a signed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionFailure {
    /// Nonce already used or not the next expected one.
    NonceConflict,
    /// Balance cannot cover value + gas.
    InsufficientFunds,
    /// Any other rejection (malformed payload, underpriced, ...).
    Rejected,
}

impl SubmissionFailure {
    /// Classify a node error message.
    pub fn classify(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        const NONCE_HINTS: [&str; 5] = [
            "nonce too low",
            "nonce too high",
            "already known",
            "replacement transaction underpriced",
            "correct nonce",
        ];
        if NONCE_HINTS.iter().any(|hint| message.contains(hint)) {
            Self::NonceConflict
        } else if message.contains("insufficient funds") {
            Self::InsufficientFunds
        } else {
            Self::Rejected
        }
    }
}

impl std::fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonceConflict => write!(f, "nonce conflict"),
            Self::InsufficientFunds => write!(f, "insufficient funds"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// No receipt within the configured wait.
    #[error("Transaction {tx_hash} not confirmed after {waited_secs} seconds")]
    ConfirmationTimeout { tx_hash: TxHash, waited_secs: u64 },

    /// Transaction was mined with failure status.
    #[error("Transaction reverted: {0}")]
    Reverted(TxHash),

    /// Missing or malformed credential, or signing failure.
    #[error("Signing error: {0}")]
    Signing(String),

    /// The node refused the signed transaction.
    #[error("Transaction submission failed ({kind}): {message}")]
    Submission {
        kind: SubmissionFailure,
        message: String,
    },

    /// A read-only call reverted.
    #[error("Call to {function} failed: {message}")]
    Call { function: String, message: String },

    /// Function lookup or argument/return encoding failed.
    #[error("ABI error: {0}")]
    Abi(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// A contract-creation receipt without a contract address.
    #[error("Receipt for {0} carries no contract address")]
    MissingContractAddress(TxHash),
}

impl BlockchainError {
    pub fn is_nonce_conflict(&self) -> bool {
        matches!(
            self,
            Self::Submission {
                kind: SubmissionFailure::NonceConflict,
                ..
            }
        )
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;
