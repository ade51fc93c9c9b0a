//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, chain id set)
//! - Check addresses, URLs and version strings are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DeployConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;

use crate::config::schema::DeployConfig;

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g., `network.chain_id`).
    pub field: &'static str,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a parsed configuration.
pub fn validate_config(config: &DeployConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let network = &config.network;
    match url::Url::parse(&network.rpc_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "network.rpc_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "network.rpc_url",
            format!("invalid URL '{}': {}", network.rpc_url, e),
        )),
    }
    if network.chain_id == 0 {
        errors.push(ValidationError::new("network.chain_id", "must be greater than 0"));
    }
    if network.sender_address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "network.sender_address",
            format!("'{}' is not a 20-byte hex address", network.sender_address),
        ));
    }
    if network.private_key_env.trim().is_empty() {
        errors.push(ValidationError::new("network.private_key_env", "must not be empty"));
    }
    if network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be greater than 0"));
    }
    if network.gas_limit == Some(0) {
        errors.push(ValidationError::new("network.gas_limit", "must be greater than 0"));
    }

    let compiler = &config.compiler;
    if compiler.source_path.as_os_str().is_empty() {
        errors.push(ValidationError::new("compiler.source_path", "must not be empty"));
    }
    if compiler.contract_name.trim().is_empty() {
        errors.push(ValidationError::new("compiler.contract_name", "must not be empty"));
    }
    if compiler.language.trim().is_empty() {
        errors.push(ValidationError::new("compiler.language", "must not be empty"));
    }
    if !is_release_version(&compiler.version) {
        errors.push(ValidationError::new(
            "compiler.version",
            format!("'{}' is not of the form MAJOR.MINOR.PATCH", compiler.version),
        ));
    }
    if compiler.output_selection.is_empty() {
        errors.push(ValidationError::new("compiler.output_selection", "must not be empty"));
    }
    if compiler.solc_path.is_none() && url::Url::parse(&compiler.binaries_url).is_err() {
        errors.push(ValidationError::new(
            "compiler.binaries_url",
            format!("invalid URL '{}'", compiler.binaries_url),
        ));
    }

    let confirmation = &config.confirmation;
    if confirmation.timeout_secs == 0 {
        errors.push(ValidationError::new("confirmation.timeout_secs", "must be greater than 0"));
    }
    if confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new(
            "confirmation.poll_interval_ms",
            "must be greater than 0",
        ));
    }
    if confirmation.poll_interval_ms > confirmation.max_poll_interval_ms {
        errors.push(ValidationError::new(
            "confirmation.max_poll_interval_ms",
            "must not be smaller than poll_interval_ms",
        ));
    }
    if confirmation.confirmation_blocks == 0 {
        errors.push(ValidationError::new(
            "confirmation.confirmation_blocks",
            "must be at least 1",
        ));
    }

    let interaction = &config.interaction;
    if interaction.read_function.trim().is_empty() {
        errors.push(ValidationError::new("interaction.read_function", "must not be empty"));
    }
    if interaction.write_function.trim().is_empty() {
        errors.push(ValidationError::new("interaction.write_function", "must not be empty"));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_release_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
