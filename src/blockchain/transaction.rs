//! Transaction building, signing, submission and confirmation.
//!
//! # Responsibilities
//! - Build transactions from an intent and a sender context
//! - Sign and broadcast transactions (exactly once; no resubmission)
//! - Poll for receipts with bounded timeout and backoff

use alloy::consensus::TxEnvelope;
use alloy::dyn_abi::DynSolValue;
use alloy::eips::eip2718::Encodable2718;
use alloy::json_abi::JsonAbi;
use alloy::network::TransactionBuilder;
use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use std::time::Duration;

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::contract::{encode_constructor_args, DeployedContract};
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::wallet::Wallet;
use crate::config::ConfirmationConfig;
use crate::resilience::{Deadline, PollBackoff};

/// What a transaction should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxIntent {
    /// Create a contract: creation bytecode followed by encoded constructor arguments.
    Deploy {
        bytecode: Bytes,
        constructor_args: Bytes,
    },
    /// Invoke a function on an existing contract.
    Call { to: Address, input: Bytes },
}

impl TxIntent {
    pub fn deploy(bytecode: Bytes, abi: &JsonAbi, args: &[DynSolValue]) -> BlockchainResult<Self> {
        Ok(Self::Deploy {
            bytecode,
            constructor_args: encode_constructor_args(abi, args)?,
        })
    }

    pub fn call(
        contract: &DeployedContract,
        function: &str,
        args: &[DynSolValue],
    ) -> BlockchainResult<Self> {
        Ok(Self::Call {
            to: contract.address(),
            input: contract.encode_call(function, args)?,
        })
    }
}

/// Sender-side parameters fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    pub from: Address,
    pub nonce: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

/// A signed transaction ready for broadcast.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    raw: Bytes,
    hash: TxHash,
    nonce: u64,
}

impl SignedTransaction {
    fn new(envelope: TxEnvelope, nonce: u64) -> Self {
        let raw = Bytes::from(envelope.encoded_2718());
        let hash = keccak256(&raw);
        Self { raw, hash, nonce }
    }

    /// EIP-2718 encoding as sent to the node.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

/// Transaction pipeline bound to one client.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    client: BlockchainClient,
    confirmation: ConfirmationConfig,
}

impl TxBuilder {
    /// Create a new transaction builder.
    pub fn new(client: BlockchainClient, confirmation: ConfirmationConfig) -> Self {
        Self {
            client,
            confirmation,
        }
    }

    pub fn client(&self) -> &BlockchainClient {
        &self.client
    }

    /// Current gas price, refused when above the configured ceiling.
    async fn gas_price(&self) -> BlockchainResult<u128> {
        let gas_price = self.client.get_gas_price().await?;

        if let Some(max_gwei) = self.client.config().max_gas_price_gwei {
            let current_gwei = gas_price / 1_000_000_000;
            if current_gwei > max_gwei as u128 {
                return Err(BlockchainError::GasPriceTooHigh {
                    current_gwei: current_gwei as u64,
                    max_gwei,
                });
            }
        }
        Ok(gas_price)
    }

    /// The configured fixed limit or the node's estimate.
    async fn gas_limit(&self, request: &TransactionRequest) -> BlockchainResult<u64> {
        match self.client.config().gas_limit {
            Some(limit) => Ok(limit),
            None => self.client.estimate_gas(request).await,
        }
    }

    /// Build a request for `intent` and assign it `wallet`'s next nonce.
    ///
    /// The nonce is taken last, so a failed gas price query or estimate
    /// leaves the wallet's sequence untouched.
    pub async fn prepare(
        &self,
        intent: TxIntent,
        wallet: &Wallet,
    ) -> BlockchainResult<TransactionRequest> {
        let gas_price = self.gas_price().await?;
        let request = unsigned_request(intent, wallet.address(), gas_price, wallet.chain_id());
        let gas_limit = self.gas_limit(&request).await?;
        let nonce = wallet.next_nonce();

        tracing::debug!(
            from = %wallet.address(),
            nonce = nonce,
            gas_price = gas_price,
            gas_limit = gas_limit,
            "Transaction built"
        );
        Ok(request.with_gas_limit(gas_limit).with_nonce(nonce))
    }

    /// Build a legacy (EIP-155) transaction request for a known context.
    pub async fn build(
        &self,
        intent: TxIntent,
        ctx: TxContext,
    ) -> BlockchainResult<TransactionRequest> {
        let request =
            unsigned_request(intent, ctx.from, ctx.gas_price, ctx.chain_id).with_nonce(ctx.nonce);
        let gas_limit = self.gas_limit(&request).await?;
        Ok(request.with_gas_limit(gas_limit))
    }

    /// Sign a built request with the sender's key.
    pub async fn sign(
        &self,
        request: TransactionRequest,
        wallet: &Wallet,
    ) -> BlockchainResult<SignedTransaction> {
        let nonce = request
            .nonce
            .ok_or_else(|| BlockchainError::Signing("request has no nonce".to_string()))?;
        let envelope = wallet.sign_transaction(request).await?;
        Ok(SignedTransaction::new(envelope, nonce))
    }

    /// Broadcast a signed transaction. Never retried.
    pub async fn submit(&self, signed: &SignedTransaction) -> BlockchainResult<TxHash> {
        let tx_hash = self.client.send_raw_transaction(signed.raw()).await?;
        if tx_hash != signed.hash() {
            tracing::warn!(
                local = %signed.hash(),
                node = %tx_hash,
                "Node reported a different transaction hash"
            );
        }
        tracing::info!(tx_hash = %tx_hash, nonce = signed.nonce(), "Transaction submitted");
        Ok(tx_hash)
    }

    /// Poll until the transaction is mined with enough confirmations.
    ///
    /// A mined receipt with failure status is returned as [`BlockchainError::Reverted`].
    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> BlockchainResult<TransactionReceipt> {
        let required = self.confirmation.confirmation_blocks.max(1);
        let deadline = Deadline::after(Duration::from_secs(self.confirmation.timeout_secs));
        let mut backoff = PollBackoff::new(
            self.confirmation.poll_interval_ms,
            self.confirmation.max_poll_interval_ms,
        );

        loop {
            // A hung receipt query must not outlive the wait itself.
            let limit = deadline.clamp(self.client.timeout());
            let polled = match self.client.get_transaction_receipt_within(tx_hash, limit).await {
                Err(BlockchainError::Timeout(_)) if limit < self.client.timeout() => None,
                other => other?,
            };

            match polled {
                Some(receipt) => {
                    if !receipt.status() {
                        return Err(BlockchainError::Reverted(tx_hash));
                    }
                    let confirmations = self.confirmations(&receipt, required).await?;
                    if confirmations >= required {
                        tracing::info!(
                            tx_hash = %tx_hash,
                            block_number = receipt.block_number.unwrap_or_default(),
                            gas_used = receipt.gas_used,
                            polls = backoff.attempts() + 1,
                            "Transaction confirmed"
                        );
                        return Ok(receipt);
                    }
                    tracing::debug!(
                        tx_hash = %tx_hash,
                        confirmations = confirmations,
                        required = required,
                        "Waiting for confirmations"
                    );
                }
                None => {
                    tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                }
            }

            if deadline.is_expired() {
                return Err(BlockchainError::ConfirmationTimeout {
                    tx_hash,
                    waited_secs: deadline.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(deadline.clamp(backoff.next_delay())).await;
        }
    }

    async fn confirmations(
        &self,
        receipt: &TransactionReceipt,
        required: u32,
    ) -> BlockchainResult<u32> {
        // The inclusion block is the first confirmation.
        if required == 1 {
            return Ok(1);
        }
        let current_block = self.client.get_block_number().await?;
        let tx_block = receipt.block_number.unwrap_or(current_block);
        Ok((current_block.saturating_sub(tx_block) + 1).min(u32::MAX as u64) as u32)
    }

    /// Build, sign, submit and confirm in one go.
    pub async fn send(&self, intent: TxIntent, wallet: &Wallet) -> BlockchainResult<TransactionReceipt> {
        let request = self.prepare(intent, wallet).await?;
        let signed = self.sign(request, wallet).await?;
        let tx_hash = self.submit(&signed).await?;
        self.wait_for_receipt(tx_hash).await
    }
}

/// Legacy request for `intent` with everything but nonce and gas limit.
fn unsigned_request(
    intent: TxIntent,
    from: Address,
    gas_price: u128,
    chain_id: u64,
) -> TransactionRequest {
    let request = TransactionRequest::default()
        .with_from(from)
        .with_gas_price(gas_price)
        .with_chain_id(chain_id)
        .with_value(U256::ZERO);

    match intent {
        TxIntent::Deploy {
            bytecode,
            constructor_args,
        } => {
            let mut code = bytecode.to_vec();
            code.extend_from_slice(&constructor_args);
            request.with_deploy_code(Bytes::from(code))
        }
        TxIntent::Call { to, input } => request.with_to(to).with_input(input),
    }
}
