//! Compilation artifact handling.
//!
//! # Responsibilities
//! - Model the `solc --standard-json` output shape
//! - Persist the raw output for inspection
//! - Extract ABI and bytecode for a single contract

use alloy::json_abi::JsonAbi;
use alloy::primitives::{hex, Bytes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::compiler::{CompilerError, CompilerResult};

/// Typed view of the compiler output.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompilerOutput {
    /// Source identifier → contract name → contract output.
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, ContractOutput>>,

    /// Errors and warnings emitted by the compiler.
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
}

/// Output for one contract.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContractOutput {
    #[serde(default)]
    pub abi: Option<JsonAbi>,
    /// Compiler metadata (a JSON document encoded as a string).
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub evm: Option<EvmOutput>,
}

/// EVM-related outputs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EvmOutput {
    #[serde(default)]
    pub bytecode: Option<BytecodeOutput>,
}

/// Creation bytecode.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BytecodeOutput {
    /// Hex without `0x` prefix. Unlinked libraries appear as `__$...$__`.
    pub object: String,
    #[serde(default)]
    pub source_map: Option<String>,
}

/// A compiler diagnostic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// `error`, `warning` or `info`.
    pub severity: String,
    pub message: String,
    #[serde(default)]
    pub formatted_message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity.eq_ignore_ascii_case("error")
    }

    /// Best human-readable rendering.
    pub fn render(&self) -> &str {
        self.formatted_message
            .as_deref()
            .map(str::trim_end)
            .unwrap_or(self.message.as_str())
    }
}

/// Full compiler output: the raw document plus its typed view.
#[derive(Debug, Clone)]
pub struct CompilationArtifact {
    raw: serde_json::Value,
    output: CompilerOutput,
}

impl CompilationArtifact {
    pub fn from_value(raw: serde_json::Value) -> CompilerResult<Self> {
        let output: CompilerOutput = serde_json::from_value(raw.clone())
            .map_err(|e| CompilerError::InvalidArtifact(e.to_string()))?;
        Ok(Self { raw, output })
    }

    pub fn from_slice(bytes: &[u8]) -> CompilerResult<Self> {
        let raw: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| CompilerError::InvalidArtifact(e.to_string()))?;
        Self::from_value(raw)
    }

    /// Read a previously persisted artifact.
    pub fn load(path: &Path) -> CompilerResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| CompilerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }

    /// Write the raw output as JSON, replacing any previous file.
    pub fn persist(&self, path: &Path) -> CompilerResult<()> {
        let io_err = |source| CompilerError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_vec(&self.raw)
            .map_err(|e| CompilerError::InvalidArtifact(e.to_string()))?;
        std::fs::write(path, json).map_err(io_err)?;

        tracing::info!(path = %path.display(), "Compilation artifact written");
        Ok(())
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    pub fn output(&self) -> &CompilerOutput {
        &self.output
    }

    /// Diagnostics with severity `error`.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.output.errors.iter().filter(|d| d.is_error())
    }

    /// Diagnostics that do not fail the compilation.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.output.errors.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Extract ABI and bytecode for one contract.
    pub fn contract(&self, source_id: &str, name: &str) -> CompilerResult<ContractArtifact> {
        let missing = || CompilerError::MissingContract {
            source_id: source_id.to_string(),
            contract: name.to_string(),
        };
        let output = self
            .output
            .contracts
            .get(source_id)
            .and_then(|contracts| contracts.get(name))
            .ok_or_else(missing)?;

        let abi = output.abi.clone().ok_or_else(|| {
            CompilerError::InvalidArtifact(format!("{name} has no ABI; add \"abi\" to the output selection"))
        })?;
        let object = output
            .evm
            .as_ref()
            .and_then(|evm| evm.bytecode.as_ref())
            .map(|b| b.object.as_str())
            .ok_or_else(|| {
                CompilerError::InvalidArtifact(format!(
                    "{name} has no bytecode; add \"evm.bytecode\" to the output selection"
                ))
            })?;

        Ok(ContractArtifact {
            source_id: source_id.to_string(),
            name: name.to_string(),
            abi,
            bytecode: decode_bytecode(name, object)?,
            metadata: output.metadata.clone(),
        })
    }
}

fn decode_bytecode(name: &str, object: &str) -> CompilerResult<Bytes> {
    let object = object.trim().trim_start_matches("0x");
    if object.is_empty() {
        return Err(CompilerError::InvalidArtifact(format!(
            "{name} has empty bytecode (abstract contract or interface?)"
        )));
    }
    if object.contains("__") {
        return Err(CompilerError::InvalidArtifact(format!(
            "{name} references unlinked libraries"
        )));
    }
    hex::decode(object)
        .map(Bytes::from)
        .map_err(|e| CompilerError::InvalidArtifact(format!("{name} bytecode is not hex: {e}")))
}

/// ABI and creation bytecode of one compiled contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractArtifact {
    pub source_id: String,
    pub name: String,
    pub abi: JsonAbi,
    pub bytecode: Bytes,
    pub metadata: Option<serde_json::Value>,
}
