//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a deployment
//! target. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for one deployment target.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DeployConfig {
    /// Blockchain endpoint and sender account.
    pub network: NetworkConfig,

    /// Compiler toolchain and source settings.
    pub compiler: CompilerConfig,

    /// Receipt polling settings.
    pub confirmation: ConfirmationConfig,

    /// Post-deployment read/write calls.
    pub interaction: InteractionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Blockchain endpoint configuration.
///
/// Unknown fields are rejected so that misspelled keys such as `chainId`
/// fail loudly instead of silently falling back to the default chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID used for EIP-155 signing (1337 for Ganache, 31337 for Anvil).
    pub chain_id: u64,

    /// Address transactions are sent from.
    pub sender_address: String,

    /// Environment variable holding the sender's private key.
    pub private_key_env: String,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Fixed gas limit. When unset the node's estimate is used.
    pub gas_limit: Option<u64>,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 1337,
            sender_address: "0x90F8bf6A479f320ead074411a4B0e7944Ea8c9C1".to_string(),
            private_key_env: "PRIVATE_KEY".to_string(),
            rpc_timeout_secs: 10,
            gas_limit: None,
            max_gas_price_gwei: None,
        }
    }
}

/// Compiler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Path to the contract source file.
    pub source_path: PathBuf,

    /// Contract to extract from the compilation output.
    pub contract_name: String,

    /// Source language tag passed to the compiler.
    pub language: String,

    /// Exact compiler release (e.g., "0.6.0").
    pub version: String,

    /// Outputs requested for every contract.
    pub output_selection: Vec<String>,

    /// Where the raw compiler output is written.
    pub artifact_path: PathBuf,

    /// Directory holding provisioned compiler binaries.
    pub install_dir: PathBuf,

    /// Release server for compiler binaries.
    pub binaries_url: String,

    /// Explicit compiler binary. Skips provisioning when set.
    pub solc_path: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("contracts/SimpleStorage.sol"),
            contract_name: "Storage".to_string(),
            language: "Solidity".to_string(),
            version: "0.6.0".to_string(),
            output_selection: vec![
                "abi".to_string(),
                "metadata".to_string(),
                "evm.bytecode".to_string(),
                "evm.sourceMap".to_string(),
            ],
            artifact_path: PathBuf::from("compiled_code.json"),
            install_dir: PathBuf::from(".solc"),
            binaries_url: "https://binaries.soliditylang.org".to_string(),
            solc_path: None,
        }
    }
}

/// Receipt polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Maximum time to wait for a receipt in seconds.
    pub timeout_secs: u64,

    /// First polling delay in milliseconds.
    pub poll_interval_ms: u64,

    /// Upper bound for the polling delay in milliseconds.
    pub max_poll_interval_ms: u64,

    /// Number of blocks (including the inclusion block) required.
    pub confirmation_blocks: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            poll_interval_ms: 100,
            max_poll_interval_ms: 2000,
            confirmation_blocks: 1,
        }
    }
}

/// Interaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// View function returning the stored value.
    pub read_function: String,

    /// Function taking one `uint256` that mutates the stored value.
    pub write_function: String,

    /// Value written by the write call.
    pub store_value: u64,

    /// Read the value again after the write is confirmed.
    pub reread: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            read_function: "retrieve".to_string(),
            write_function: "store".to_string(),
            store_value: 7,
            reread: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
