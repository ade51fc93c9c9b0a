//! Contract deployment workflow library.
//!
//! Compiles a Solidity contract, deploys it to an EVM JSON-RPC node and
//! exercises it with one read, one write and a second read.

pub mod blockchain;
pub mod compiler;
pub mod config;
pub mod observability;
pub mod resilience;
pub mod workflow;

pub use config::schema::DeployConfig;
pub use workflow::{Workflow, WorkflowError, WorkflowReport};
