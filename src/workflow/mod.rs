//! Deployment workflow.
//!
//! # Data Flow
//! ```text
//! Solidity source
//!     → compiler (provision, compile, persist artifact, extract contract)
//!     → connect (chain id check, sender check, nonce sync)
//!     → deploy.rs (Unbuilt → Built → Signed → Submitted → Confirmed → Deployed)
//!     → interact.rs (read, write with next nonce, read again)
//! ```
//!
//! Every stage failure is terminal. Nothing already on chain is rolled back.

pub mod deploy;
pub mod error;
pub mod interact;

use alloy::primitives::{Address, U256};
use std::path::Path;

use crate::blockchain::{BlockchainClient, DeployedContract, TxBuilder, Wallet};
use crate::compiler::{load_source, CompilationArtifact, Compiler, ContractArtifact};
use crate::config::DeployConfig;

pub use deploy::{Deployment, DeploymentDriver, DeploymentError, DeploymentPhase, DeploymentState};
pub use error::WorkflowError;
pub use interact::{InteractionDriver, InteractionError, InteractionReport, InteractionStep};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub deployment: Deployment,
    pub interaction: InteractionReport,
}

/// One parameterized deployment run.
#[derive(Debug, Clone)]
pub struct Workflow {
    config: DeployConfig,
}

impl Workflow {
    pub fn new(config: DeployConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Compile the configured source, persist the full output, extract the contract.
    pub async fn compile(&self) -> Result<(CompilationArtifact, ContractArtifact), WorkflowError> {
        let cfg = &self.config.compiler;
        let source = load_source(&cfg.source_path)?;
        let compiler = Compiler::from_config(cfg);

        let artifact = compiler.compile(&source).await?;
        artifact.persist(&cfg.artifact_path)?;

        let contract = artifact.contract(&source.name, &cfg.contract_name)?;
        Ok((artifact, contract))
    }

    /// Open the chain connection and line the wallet up with it.
    ///
    /// Checks the node's chain id, that the key controls the configured sender,
    /// and raises the wallet's nonce counter to the node's transaction count.
    pub async fn connect(&self, wallet: &Wallet) -> Result<TxBuilder, WorkflowError> {
        let network = &self.config.network;
        let client = BlockchainClient::new(network.clone()).map_err(WorkflowError::Connect)?;
        client.verify_chain_id().await.map_err(WorkflowError::Connect)?;

        let sender = sender_address(&network.sender_address).map_err(WorkflowError::Connect)?;
        wallet.ensure_address(sender).map_err(WorkflowError::Connect)?;

        let chain_nonce = client
            .get_transaction_count(wallet.address())
            .await
            .map_err(WorkflowError::Connect)?;
        let nonce = wallet.sync_nonce(chain_nonce);
        tracing::info!(sender = %sender, nonce = nonce, "Sender ready");

        Ok(TxBuilder::new(client, self.config.confirmation.clone()))
    }

    /// Deploy an already compiled contract and run the interaction sequence.
    pub async fn deploy_and_interact(
        &self,
        contract: &ContractArtifact,
        wallet: &Wallet,
    ) -> Result<WorkflowReport, WorkflowError> {
        let builder = self.connect(wallet).await?;
        let deployment = DeploymentDriver::new(&builder, wallet, contract).run().await?;

        let interaction = self.interaction_driver(&builder, wallet, deployment.contract.clone());
        let value = U256::from(self.config.interaction.store_value);
        let report = interaction.run(value, self.config.interaction.reread).await?;

        Ok(WorkflowReport {
            deployment,
            interaction: report,
        })
    }

    /// Full run: compile, deploy, interact.
    pub async fn run(&self, wallet: &Wallet) -> Result<WorkflowReport, WorkflowError> {
        let (_, contract) = self.compile().await?;
        self.deploy_and_interact(&contract, wallet).await
    }

    /// Read the current value of an existing deployment.
    ///
    /// The ABI comes from the artifact persisted by an earlier compile.
    pub async fn retrieve(&self, address: Address) -> Result<U256, WorkflowError> {
        let cfg = &self.config.compiler;
        let artifact = CompilationArtifact::load(&cfg.artifact_path)?;
        let source_id = source_id(&cfg.source_path);
        let contract = artifact.contract(&source_id, &cfg.contract_name)?;

        let client =
            BlockchainClient::new(self.config.network.clone()).map_err(WorkflowError::Connect)?;
        client.verify_chain_id().await.map_err(WorkflowError::Connect)?;

        let handle = DeployedContract::new(address, contract.abi);
        let value = client
            .call_contract(&handle, &self.config.interaction.read_function, &[])
            .await
            .and_then(|values| crate::blockchain::contract::first_uint(&values))
            .map_err(|source| InteractionError {
                step: InteractionStep::Read,
                source,
            })?;
        tracing::info!(address = %address, value = %value, "Current value");
        Ok(value)
    }

    fn interaction_driver<'a>(
        &self,
        builder: &'a TxBuilder,
        wallet: &'a Wallet,
        contract: DeployedContract,
    ) -> InteractionDriver<'a> {
        InteractionDriver::new(builder, wallet, contract).with_functions(
            self.config.interaction.read_function.clone(),
            self.config.interaction.write_function.clone(),
        )
    }
}

fn sender_address(raw: &str) -> crate::blockchain::BlockchainResult<Address> {
    raw.parse().map_err(|e| {
        crate::blockchain::BlockchainError::Signing(format!("Invalid sender address '{raw}': {e}"))
    })
}

/// Source unit name solc reports for `path`.
fn source_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
