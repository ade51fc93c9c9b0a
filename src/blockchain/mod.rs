//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variable (private key)
//!     → wallet.rs (key loading, signing, nonce sequence)
//!     → client.rs (RPC connection with timeouts)
//!     → transaction.rs (build, sign, broadcast, confirm)
//!     → contract.rs (deployed handle, call encoding)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod contract;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use contract::DeployedContract;
pub use transaction::{SignedTransaction, TxBuilder, TxContext, TxIntent};
pub use types::{BlockchainError, BlockchainResult, ChainId, SubmissionFailure};
pub use wallet::Wallet;
