//! Contract source loading.

use std::path::Path;

use crate::compiler::{CompilerError, CompilerResult};

/// Source text plus the identifier the compiler output is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// File name, e.g. `SimpleStorage.sol`.
    pub name: String,
    pub content: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Read a contract source file.
pub fn load_source(path: &Path) -> CompilerResult<SourceUnit> {
    let content = std::fs::read_to_string(path).map_err(|source| CompilerError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CompilerError::InvalidArtifact(format!("{} has no file name", path.display()))
        })?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "Loaded contract source");
    Ok(SourceUnit { name, content })
}
