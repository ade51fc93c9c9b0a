//! Contract deployment state machine.
//!
//! ```text
//! Unbuilt → Built → Signed → Submitted → Confirmed → Deployed
//! ```
//!
//! Every transition either advances exactly one state or fails terminally.
//! Nothing is retried; a failed driver is dropped without a handle.

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Bytes, TxHash};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use thiserror::Error;

use crate::blockchain::{
    BlockchainError, DeployedContract, SignedTransaction, TxBuilder, TxIntent, Wallet,
};
use crate::compiler::ContractArtifact;

/// Name of a deployment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentPhase {
    Unbuilt,
    Built,
    Signed,
    Submitted,
    Confirmed,
    Deployed,
}

impl std::fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unbuilt => "unbuilt",
            Self::Built => "built",
            Self::Signed => "signed",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Deployed => "deployed",
        };
        f.write_str(name)
    }
}

/// Deployment state with the data produced so far.
#[derive(Debug, Clone)]
pub enum DeploymentState {
    Unbuilt,
    Built(TransactionRequest),
    Signed(SignedTransaction),
    Submitted(TxHash),
    Confirmed(TransactionReceipt),
    Deployed(DeployedContract),
}

impl DeploymentState {
    pub fn phase(&self) -> DeploymentPhase {
        match self {
            Self::Unbuilt => DeploymentPhase::Unbuilt,
            Self::Built(_) => DeploymentPhase::Built,
            Self::Signed(_) => DeploymentPhase::Signed,
            Self::Submitted(_) => DeploymentPhase::Submitted,
            Self::Confirmed(_) => DeploymentPhase::Confirmed,
            Self::Deployed(_) => DeploymentPhase::Deployed,
        }
    }
}

/// A transition that failed, with the state it was leaving.
#[derive(Debug, Error)]
#[error("{source} (while {phase})")]
pub struct DeploymentError {
    pub phase: DeploymentPhase,
    #[source]
    pub source: BlockchainError,
}

/// Outcome of a completed deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub contract: DeployedContract,
    pub receipt: TransactionReceipt,
    pub nonce: u64,
}

/// Drives one contract creation through its states.
pub struct DeploymentDriver<'a> {
    builder: &'a TxBuilder,
    wallet: &'a Wallet,
    name: String,
    abi: JsonAbi,
    bytecode: Bytes,
    constructor_args: Vec<DynSolValue>,
    state: DeploymentState,
    nonce: Option<u64>,
    receipt: Option<TransactionReceipt>,
}

impl<'a> DeploymentDriver<'a> {
    pub fn new(builder: &'a TxBuilder, wallet: &'a Wallet, artifact: &ContractArtifact) -> Self {
        Self {
            builder,
            wallet,
            name: artifact.name.clone(),
            abi: artifact.abi.clone(),
            bytecode: artifact.bytecode.clone(),
            constructor_args: Vec::new(),
            state: DeploymentState::Unbuilt,
            nonce: None,
            receipt: None,
        }
    }

    pub fn with_constructor_args(mut self, args: Vec<DynSolValue>) -> Self {
        self.constructor_args = args;
        self
    }

    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    /// Perform one transition. Returns the phase reached.
    pub async fn advance(&mut self) -> Result<DeploymentPhase, DeploymentError> {
        let phase = self.state.phase();
        let fail = |source| DeploymentError { phase, source };

        let next = match &self.state {
            DeploymentState::Unbuilt => {
                tracing::info!(contract = %self.name, "Deploying contract");
                let intent =
                    TxIntent::deploy(self.bytecode.clone(), &self.abi, &self.constructor_args)
                        .map_err(fail)?;
                let request = self
                    .builder
                    .prepare(intent, self.wallet)
                    .await
                    .map_err(fail)?;
                self.nonce = request.nonce;
                DeploymentState::Built(request)
            }
            DeploymentState::Built(request) => {
                let signed = self
                    .builder
                    .sign(request.clone(), self.wallet)
                    .await
                    .map_err(fail)?;
                DeploymentState::Signed(signed)
            }
            DeploymentState::Signed(signed) => {
                let tx_hash = self.builder.submit(signed).await.map_err(fail)?;
                DeploymentState::Submitted(tx_hash)
            }
            DeploymentState::Submitted(tx_hash) => {
                let receipt = self
                    .builder
                    .wait_for_receipt(*tx_hash)
                    .await
                    .map_err(fail)?;
                DeploymentState::Confirmed(receipt)
            }
            DeploymentState::Confirmed(receipt) => {
                let address = receipt.contract_address.ok_or_else(|| {
                    fail(BlockchainError::MissingContractAddress(receipt.transaction_hash))
                })?;
                self.receipt = Some(receipt.clone());
                tracing::info!(contract = %self.name, address = %address, "Contract deployed");
                DeploymentState::Deployed(DeployedContract::new(address, self.abi.clone()))
            }
            DeploymentState::Deployed(_) => return Ok(DeploymentPhase::Deployed),
        };

        self.state = next;
        tracing::debug!(from = %phase, to = %self.state.phase(), "Deployment advanced");
        Ok(self.state.phase())
    }

    /// Advance until deployed.
    pub async fn run(mut self) -> Result<Deployment, DeploymentError> {
        while self.advance().await? != DeploymentPhase::Deployed {}

        match (self.state, self.receipt, self.nonce) {
            (DeploymentState::Deployed(contract), Some(receipt), Some(nonce)) => Ok(Deployment {
                contract,
                receipt,
                nonce,
            }),
            (state, ..) => Err(DeploymentError {
                phase: state.phase(),
                source: BlockchainError::Rpc("deployment finished without a receipt".to_string()),
            }),
        }
    }
}
