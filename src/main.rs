//! Contract deployer CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   deploy.toml + flags + .env
//!            │
//!            ▼
//!   ┌─────────────────┐    ┌──────────────┐    ┌──────────────────────┐
//!   │    compiler     │───▶│   workflow   │───▶│      blockchain      │
//!   │ provision, solc │    │ deploy,      │    │ client, wallet,      │
//!   │ artifact        │    │ interact     │    │ tx builder           │
//!   └─────────────────┘    └──────────────┘    └──────────┬───────────┘
//!                                                         │ JSON-RPC
//!                                                         ▼
//!                                                   Ethereum node
//! ```

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;

use contract_deployer::blockchain::Wallet;
use contract_deployer::config::validation::validate_config;
use contract_deployer::config::{load_config, ConfigError, DeployConfig};
use contract_deployer::observability::{init_logging, new_run_id, run_span};
use contract_deployer::{Workflow, WorkflowError};

#[derive(Parser)]
#[command(name = "contract-deployer")]
#[command(about = "Compile, deploy and exercise a Solidity contract", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "deploy.toml")]
    config: PathBuf,

    /// JSON-RPC endpoint override
    #[arg(long, env = "DEPLOY_RPC_URL")]
    rpc_url: Option<String>,

    /// Chain id override
    #[arg(long, env = "DEPLOY_CHAIN_ID")]
    chain_id: Option<u64>,

    /// Sender address override
    #[arg(long, env = "DEPLOY_SENDER")]
    sender: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the contract and write the artifact
    Compile,
    /// Compile, deploy, then read, write and re-read
    Run {
        /// Value passed to the write function
        #[arg(long)]
        value: Option<u64>,
        /// Skip the read after the write
        #[arg(long)]
        no_reread: bool,
    },
    /// Read the current value of an existing deployment
    Retrieve {
        #[arg(long)]
        address: Address,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Compile => "compile",
            Commands::Run { .. } => "run",
            Commands::Retrieve { .. } => "retrieve",
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Workflow(#[from] WorkflowError),
    #[error("signing setup failed: {0}")]
    Wallet(#[from] contract_deployer::blockchain::BlockchainError),
}

impl CliError {
    fn stage(&self) -> &'static str {
        match self {
            CliError::Config(_) => "config",
            CliError::Workflow(e) => e.stage(),
            CliError::Wallet(_) => "sign",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error [config]: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("warning: logging already initialized: {e}");
    }

    let span = run_span(new_run_id(), cli.command.name());
    match execute(cli.command, config).instrument(span).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(stage = e.stage(), error = %e, "Run failed");
            eprintln!("error [{}]: {e}", e.stage());
            ExitCode::FAILURE
        }
    }
}

/// Load the config file and apply flag/environment overrides.
fn resolve_config(cli: &Cli) -> Result<DeployConfig, ConfigError> {
    let mut config = if cli.config.exists() {
        load_config(&cli.config)?
    } else {
        DeployConfig::default()
    };

    if let Some(rpc_url) = &cli.rpc_url {
        config.network.rpc_url = rpc_url.clone();
    }
    if let Some(chain_id) = cli.chain_id {
        config.network.chain_id = chain_id;
    }
    if let Some(sender) = &cli.sender {
        config.network.sender_address = sender.clone();
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

async fn execute(command: Commands, mut config: DeployConfig) -> Result<(), CliError> {
    tracing::info!(
        rpc_url = %config.network.rpc_url,
        chain_id = config.network.chain_id,
        compiler_version = %config.compiler.version,
        "Configuration loaded"
    );

    match command {
        Commands::Compile => {
            let workflow = Workflow::new(config);
            let (artifact, contract) = workflow.compile().await?;
            println!("Compiled {} ({} bytes of bytecode)", contract.name, contract.bytecode.len());
            println!("ABI entries: {}", contract.abi.len());
            println!("Warnings: {}", artifact.warnings().count());
        }
        Commands::Run { value, no_reread } => {
            if let Some(value) = value {
                config.interaction.store_value = value;
            }
            if no_reread {
                config.interaction.reread = false;
            }
            let wallet = Wallet::from_env(&config.network.private_key_env, config.network.chain_id)?;
            let workflow = Workflow::new(config);
            let report = workflow.run(&wallet).await?;

            println!("Deployed at {}", report.deployment.contract.address());
            println!("Initial value: {}", report.interaction.initial);
            println!(
                "Stored {} in {}",
                report.interaction.stored, report.interaction.write_tx
            );
            if let Some(updated) = report.interaction.updated {
                println!("Updated value: {updated}");
            }
        }
        Commands::Retrieve { address } => {
            let value = Workflow::new(config).retrieve(address).await?;
            println!("{value}");
        }
    }
    Ok(())
}
