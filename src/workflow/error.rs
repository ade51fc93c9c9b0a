//! Stage-level errors of the deployment workflow.

use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::compiler::CompilerError;
use crate::workflow::deploy::DeploymentError;
use crate::workflow::interact::InteractionError;

/// Terminal failure of a workflow run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("compile stage failed: {0}")]
    Compile(#[from] CompilerError),

    #[error("connect stage failed: {0}")]
    Connect(#[source] BlockchainError),

    #[error("deploy stage failed: {0}")]
    Deploy(#[from] DeploymentError),

    #[error("interact stage failed: {0}")]
    Interact(#[from] InteractionError),
}

impl WorkflowError {
    /// Short stage name for diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Compile(_) => "compile",
            Self::Connect(_) => "connect",
            Self::Deploy(_) => "deploy",
            Self::Interact(_) => "interact",
        }
    }

    /// The chain error underneath, if any.
    pub fn blockchain_error(&self) -> Option<&BlockchainError> {
        match self {
            Self::Compile(_) => None,
            Self::Connect(e) => Some(e),
            Self::Deploy(e) => Some(&e.source),
            Self::Interact(e) => Some(&e.source),
        }
    }
}
