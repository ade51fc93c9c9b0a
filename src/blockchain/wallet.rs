//! Sender account: signing key and nonce tracking.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::consensus::TxEnvelope;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Signing key plus the nonce counter of its account.
///
/// Clones share the nonce counter, so every transaction from this account
/// draws from one sequence regardless of which clone issues it.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    wallet: EthereumWallet,
    /// Next nonce to hand out.
    nonce: Arc<AtomicU64>,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Signing(format!("Invalid private key format: {}", e)))?;

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Wallet initialized"
        );

        Ok(Self {
            wallet: EthereumWallet::from(signer.clone()),
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
        })
    }

    /// Load the private key from the environment variable `var`.
    pub fn from_env(var: &str, chain_id: u64) -> BlockchainResult<Self> {
        let private_key = std::env::var(var).map_err(|_| {
            BlockchainError::Signing(format!("Environment variable {} not set", var))
        })?;
        if private_key.trim().is_empty() {
            return Err(BlockchainError::Signing(format!(
                "Environment variable {} is empty",
                var
            )));
        }

        Self::from_private_key(&private_key, chain_id)
    }

    /// Fail unless the key controls `expected`.
    pub fn ensure_address(&self, expected: Address) -> BlockchainResult<()> {
        if self.address() != expected {
            return Err(BlockchainError::Signing(format!(
                "Private key belongs to {}, not the configured sender {}",
                self.address(),
                expected
            )));
        }
        Ok(())
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get and increment the nonce atomically.
    pub fn next_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// Raise the counter to the node's transaction count.
    ///
    /// Never moves backwards, so a nonce already handed out is never reused.
    pub fn sync_nonce(&self, chain_nonce: u64) -> u64 {
        let previous = self.nonce.fetch_max(chain_nonce, Ordering::SeqCst);
        previous.max(chain_nonce)
    }

    /// Get current nonce without incrementing.
    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    /// Sign a fully built request.
    pub async fn sign_transaction(&self, request: TransactionRequest) -> BlockchainResult<TxEnvelope> {
        request
            .build(&self.wallet)
            .await
            .map_err(|e| BlockchainError::Signing(format!("Transaction signing failed: {}", e)))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .field("nonce", &self.current_nonce())
            .finish_non_exhaustive()
    }
}
