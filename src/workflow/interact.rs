//! Post-deployment interaction: read, write, read again.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{TxHash, U256};
use alloy::rpc::types::TransactionReceipt;
use thiserror::Error;

use crate::blockchain::contract::first_uint;
use crate::blockchain::{
    BlockchainError, BlockchainResult, DeployedContract, TxBuilder, TxIntent, Wallet,
};

/// Step of the interaction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionStep {
    Read,
    Write,
    Reread,
}

impl std::fmt::Display for InteractionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => f.write_str("initial read"),
            Self::Write => f.write_str("write"),
            Self::Reread => f.write_str("read after write"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{source} (during {step})")]
pub struct InteractionError {
    pub step: InteractionStep,
    #[source]
    pub source: BlockchainError,
}

/// Values observed around the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionReport {
    pub initial: U256,
    pub stored: U256,
    pub write_tx: TxHash,
    pub write_nonce: u64,
    pub updated: Option<U256>,
}

/// Issues calls against a deployed contract on behalf of one sender.
pub struct InteractionDriver<'a> {
    builder: &'a TxBuilder,
    wallet: &'a Wallet,
    contract: DeployedContract,
    read_function: String,
    write_function: String,
}

impl<'a> InteractionDriver<'a> {
    pub fn new(builder: &'a TxBuilder, wallet: &'a Wallet, contract: DeployedContract) -> Self {
        Self {
            builder,
            wallet,
            contract,
            read_function: "retrieve".to_string(),
            write_function: "store".to_string(),
        }
    }

    pub fn with_functions(mut self, read: impl Into<String>, write: impl Into<String>) -> Self {
        self.read_function = read.into();
        self.write_function = write.into();
        self
    }

    pub fn contract(&self) -> &DeployedContract {
        &self.contract
    }

    /// Read-only call; no nonce, no signature.
    pub async fn read(&self) -> BlockchainResult<U256> {
        let values = self
            .builder
            .client()
            .call_contract(&self.contract, &self.read_function, &[])
            .await?;
        first_uint(&values)
    }

    /// Signed write with the sender's next nonce, waited to confirmation.
    pub async fn write(&self, value: U256) -> BlockchainResult<(TransactionReceipt, u64)> {
        let intent = TxIntent::call(
            &self.contract,
            &self.write_function,
            &[DynSolValue::Uint(value, 256)],
        )?;
        let request = self.builder.prepare(intent, self.wallet).await?;
        let signed = self.builder.sign(request, self.wallet).await?;
        let nonce = signed.nonce();
        let tx_hash = self.builder.submit(&signed).await?;
        let receipt = self.builder.wait_for_receipt(tx_hash).await?;
        Ok((receipt, nonce))
    }

    /// Read, write `value`, and optionally read again.
    pub async fn run(&self, value: U256, reread: bool) -> Result<InteractionReport, InteractionError> {
        let initial = self.read().await.map_err(|source| InteractionError {
            step: InteractionStep::Read,
            source,
        })?;
        tracing::info!(
            contract = %self.contract.address(),
            function = %self.read_function,
            value = %initial,
            "Current value"
        );

        tracing::info!(value = %value, function = %self.write_function, "Storing new value");
        let (receipt, write_nonce) = self.write(value).await.map_err(|source| InteractionError {
            step: InteractionStep::Write,
            source,
        })?;

        let updated = if reread {
            let updated = self.read().await.map_err(|source| InteractionError {
                step: InteractionStep::Reread,
                source,
            })?;
            tracing::info!(value = %updated, "Stored new value");
            Some(updated)
        } else {
            None
        };

        Ok(InteractionReport {
            initial,
            stored: value,
            write_tx: receipt.transaction_hash,
            write_nonce,
            updated,
        })
    }
}
