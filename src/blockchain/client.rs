//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoint
//! - Query chain state (chain id, nonces, gas price, receipts)
//! - Submit signed transactions and execute read-only calls
//! - Translate node errors into the deployment error taxonomy

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::{TransportError, TransportResult};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::contract::DeployedContract;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainId, NetworkConfig, SubmissionFailure,
};
use crate::resilience::{with_timeout, Elapsed};

/// Blockchain RPC client bound to a single endpoint.
#[derive(Clone)]
pub struct BlockchainClient {
    provider: Arc<dyn Provider + Send + Sync>,
    /// Configuration.
    config: NetworkConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// No request is made; use [`verify_chain_id`](Self::verify_chain_id)
    /// to check the endpoint.
    pub fn new(config: NetworkConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);

        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        // Nonce, gas and chain id are set explicitly on every request.
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_http(url);

        tracing::debug!(rpc_url = %config.rpc_url, "Blockchain client created");

        Ok(Self {
            provider: Arc::new(provider),
            config,
            timeout_duration,
        })
    }

    /// Await an RPC future under the request timeout.
    async fn timed<F, T>(&self, fut: F) -> BlockchainResult<TransportResult<T>>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        self.timed_for(self.timeout_duration, fut).await
    }

    async fn timed_for<F, T>(&self, limit: Duration, fut: F) -> BlockchainResult<TransportResult<T>>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        with_timeout(limit, fut)
            .await
            .map_err(|Elapsed| BlockchainError::Timeout(limit.as_secs()))
    }

    /// Await an RPC future, treating every failure as a transport problem.
    async fn request<F, T>(&self, method: &'static str, fut: F) -> BlockchainResult<T>
    where
        F: IntoFuture<Output = TransportResult<T>>,
    {
        self.timed(fut).await?.map_err(|e| {
            tracing::warn!(method = method, error = %e, "RPC error");
            BlockchainError::Rpc(format!("{method} failed: {e}"))
        })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        tracing::info!(
            rpc_url = %self.config.rpc_url,
            chain_id = self.config.chain_id,
            "Connected to chain"
        );
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.request("eth_chainId", self.provider.get_chain_id())
            .await
            .map(ChainId)
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.request("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    /// Get the transaction count (next nonce) for an address.
    pub async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.request(
            "eth_getTransactionCount",
            self.provider.get_transaction_count(address),
        )
        .await
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.request("eth_gasPrice", self.provider.get_gas_price())
            .await
    }

    /// Ask the node how much gas a request needs.
    pub async fn estimate_gas(&self, request: &TransactionRequest) -> BlockchainResult<u64> {
        self.request("eth_estimateGas", self.provider.estimate_gas(request.clone()))
            .await
    }

    /// Get a transaction receipt by hash. `None` while pending.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.request(
            "eth_getTransactionReceipt",
            self.provider.get_transaction_receipt(tx_hash),
        )
        .await
    }

    /// Like [`get_transaction_receipt`](Self::get_transaction_receipt), but
    /// bounded by `limit` instead of the request timeout.
    pub async fn get_transaction_receipt_within(
        &self,
        tx_hash: TxHash,
        limit: Duration,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.timed_for(limit, self.provider.get_transaction_receipt(tx_hash))
            .await?
            .map_err(|e| {
                tracing::warn!(method = "eth_getTransactionReceipt", error = %e, "RPC error");
                BlockchainError::Rpc(format!("eth_getTransactionReceipt failed: {e}"))
            })
    }

    /// Broadcast a signed, 2718-encoded transaction.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> BlockchainResult<TxHash> {
        match self.timed(self.provider.send_raw_transaction(raw)).await? {
            Ok(pending) => Ok(*pending.tx_hash()),
            Err(e) => Err(submission_error(e)),
        }
    }

    /// Execute a read-only call against the latest state.
    pub async fn call(&self, function: &str, request: TransactionRequest) -> BlockchainResult<Bytes> {
        self.timed(self.provider.call(request))
            .await?
            .map_err(|e| match e.as_error_resp() {
                Some(payload) => BlockchainError::Call {
                    function: function.to_string(),
                    message: payload.message.to_string(),
                },
                None => BlockchainError::Rpc(format!("eth_call failed: {e}")),
            })
    }

    /// Call a view function of a deployed contract and decode its outputs.
    pub async fn call_contract(
        &self,
        contract: &DeployedContract,
        function: &str,
        args: &[DynSolValue],
    ) -> BlockchainResult<Vec<DynSolValue>> {
        let input = contract.encode_call(function, args)?;
        let request = TransactionRequest::default()
            .to(contract.address())
            .input(input.into());

        let output = self.call(function, request).await?;
        tracing::debug!(
            contract = %contract.address(),
            function = function,
            bytes = output.len(),
            "Read call returned"
        );
        contract.decode_output(function, args.len(), &output)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout_duration
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

/// Map a rejected `eth_sendRawTransaction` to a submission error.
fn submission_error(e: TransportError) -> BlockchainError {
    match e.as_error_resp() {
        Some(payload) => {
            let kind = SubmissionFailure::classify(&payload.message);
            tracing::warn!(kind = %kind, message = %payload.message, "Node rejected transaction");
            BlockchainError::Submission {
                kind,
                message: payload.message.to_string(),
            }
        }
        None => BlockchainError::Rpc(format!("eth_sendRawTransaction failed: {e}")),
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
