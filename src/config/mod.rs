//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! deploy.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CLI/environment overrides (endpoint, chain id, sender)
//!     → DeployConfig (validated, immutable for the run)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CompilerConfig, ConfirmationConfig, DeployConfig, InteractionConfig, NetworkConfig,
    ObservabilityConfig,
};
