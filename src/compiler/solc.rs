//! `solc --standard-json` process adapter.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::compiler::artifact::CompilationArtifact;
use crate::compiler::source::SourceUnit;
use crate::compiler::{CompilerError, CompilerResult};

/// Standard-JSON compiler input.
#[derive(Debug, Clone, Serialize)]
pub struct StandardJsonInput {
    pub language: String,
    pub sources: BTreeMap<String, SourceContent>,
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceContent {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// File pattern → contract pattern → requested outputs.
    pub output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl StandardJsonInput {
    /// Single-source input requesting `outputs` for every contract.
    pub fn new(language: &str, source: &SourceUnit, outputs: &[String]) -> Self {
        let mut sources = BTreeMap::new();
        sources.insert(
            source.name.clone(),
            SourceContent {
                content: source.content.clone(),
            },
        );

        let mut per_contract = BTreeMap::new();
        per_contract.insert("*".to_string(), outputs.to_vec());
        let mut output_selection = BTreeMap::new();
        output_selection.insert("*".to_string(), per_contract);

        Self {
            language: language.to_string(),
            sources,
            settings: Settings { output_selection },
        }
    }
}

/// Handle to a `solc` binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solc {
    path: PathBuf,
}

impl Solc {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> CompilerError {
        match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                CompilerError::ToolchainMissing(self.path.clone())
            }
            _ => CompilerError::Io {
                path: self.path.clone(),
                source: e,
            },
        }
    }

    /// Release reported by `solc --version` (e.g., "0.6.0").
    pub async fn version(&self) -> CompilerResult<String> {
        let output = self
            .command()
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout).ok_or_else(|| {
            CompilerError::InvalidArtifact(format!(
                "unrecognised `{} --version` output: {}",
                self.path.display(),
                stdout.trim()
            ))
        })
    }

    /// Fail unless the binary is exactly `expected`.
    pub async fn ensure_version(&self, expected: &str) -> CompilerResult<()> {
        let actual = self.version().await?;
        if actual != expected {
            return Err(CompilerError::VersionMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    /// Run one standard-JSON compilation.
    pub async fn compile(&self, input: &StandardJsonInput) -> CompilerResult<CompilationArtifact> {
        let payload = serde_json::to_vec(input)
            .map_err(|e| CompilerError::InvalidArtifact(e.to_string()))?;

        let mut child = self
            .command()
            .arg("--standard-json")
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await.map_err(|e| CompilerError::Io {
                path: self.path.clone(),
                source: e,
            })?;
            // Dropping stdin closes the pipe so solc starts compiling.
        }

        let output = child.wait_with_output().await.map_err(|e| CompilerError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        if !output.status.success() && output.stdout.is_empty() {
            return Err(CompilerError::Compilation(format!(
                "solc exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let artifact = CompilationArtifact::from_slice(&output.stdout)?;
        for warning in artifact.warnings() {
            tracing::warn!(message = %warning.render(), "Compiler warning");
        }
        if artifact.has_errors() {
            let messages: Vec<&str> = artifact.errors().map(|d| d.render()).collect();
            return Err(CompilerError::Compilation(messages.join("\n")));
        }

        tracing::debug!(
            contracts = artifact.output().contracts.values().map(|c| c.len()).sum::<usize>(),
            "Compilation finished"
        );
        Ok(artifact)
    }
}

/// Extract the release from `solc --version` output.
///
/// ```text
/// solc, the solidity compiler commandline interface
/// Version: 0.6.0+commit.26b70077.Linux.g++
/// ```
pub fn parse_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Version:"))
        .map(str::trim)
        .and_then(|v| v.split(['+', '-']).next())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
