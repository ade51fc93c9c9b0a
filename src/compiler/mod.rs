//! Compiler toolchain integration.
//!
//! # Data Flow
//! ```text
//! source file
//!     → source.rs (read text, derive source identifier)
//!     → provision.rs (locate or download the requested solc release)
//!     → solc.rs (standard-JSON in, standard-JSON out)
//!     → artifact.rs (persist raw output, extract one contract)
//! ```
//!
//! # Design Decisions
//! - The compiler is an external process; nothing is linked in
//! - The exact release is pinned and verified before every compile
//! - The raw output is kept verbatim so the persisted file matches what solc produced

pub mod artifact;
pub mod provision;
pub mod solc;
pub mod source;

use std::path::PathBuf;
use thiserror::Error;

pub use artifact::{CompilationArtifact, ContractArtifact};
pub use provision::SolcInstaller;
pub use solc::{Solc, StandardJsonInput};
pub use source::{load_source, SourceUnit};

use crate::config::CompilerConfig;

/// Errors raised while provisioning, running or reading the compiler.
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiler reported errors (syntax, type checking, ...).
    #[error("Compilation failed: {0}")]
    Compilation(String),

    /// The binary is not the requested release.
    #[error("Compiler version mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: String, actual: String },

    /// The compiler binary could not be executed.
    #[error("Compiler toolchain missing: {0}")]
    ToolchainMissing(PathBuf),

    /// The requested release could not be obtained.
    #[error("Failed to provision solc {version}: {reason}")]
    Provisioning { version: String, reason: String },

    /// The requested contract is absent from the output.
    #[error("Contract {contract} not found in source {source_id}")]
    MissingContract { source_id: String, contract: String },

    /// The output does not have the expected shape.
    #[error("Invalid compiler output: {0}")]
    InvalidArtifact(String),
}

/// Result type for compiler operations.
pub type CompilerResult<T> = Result<T, CompilerError>;

/// Compiles sources with one pinned compiler release.
#[derive(Debug, Clone)]
pub struct Compiler {
    language: String,
    version: String,
    output_selection: Vec<String>,
    explicit_solc: Option<PathBuf>,
    installer: SolcInstaller,
}

impl Compiler {
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            language: config.language.clone(),
            version: config.version.clone(),
            output_selection: config.output_selection.clone(),
            explicit_solc: config.solc_path.clone(),
            installer: SolcInstaller::new(config.install_dir.clone(), config.binaries_url.clone()),
        }
    }

    /// Make the pinned compiler release available locally.
    pub async fn provision(&self) -> CompilerResult<Solc> {
        match &self.explicit_solc {
            Some(path) => Ok(Solc::new(path.clone())),
            None => self.installer.ensure(&self.version).await,
        }
    }

    /// Compile one source unit.
    pub async fn compile(&self, source: &SourceUnit) -> CompilerResult<CompilationArtifact> {
        let solc = self.provision().await?;
        solc.ensure_version(&self.version).await?;

        let input = StandardJsonInput::new(&self.language, source, &self.output_selection);
        tracing::info!(
            source = %source.name,
            version = %self.version,
            language = %self.language,
            "Compiling contract source"
        );
        solc.compile(&input).await
    }
}
