//! Compiler release provisioning.
//!
//! Binaries live in `<install_dir>/solc-<version>`. Missing releases are
//! downloaded from the official release server:
//!
//! ```text
//! GET <binaries_url>/<platform>/list.json   → pick build with matching version
//! GET <binaries_url>/<platform>/<path>      → verify keccak256, write, chmod +x
//! ```

use alloy::primitives::{hex, keccak256};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::compiler::solc::Solc;
use crate::compiler::{CompilerError, CompilerResult};

/// Release list published per platform.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseList {
    pub builds: Vec<ReleaseBuild>,
}

/// One downloadable build.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseBuild {
    /// File name relative to the platform directory.
    pub path: String,
    pub version: String,
    #[serde(default)]
    pub prerelease: Option<String>,
    pub keccak256: String,
}

impl ReleaseList {
    /// Stable build for an exact version.
    pub fn find(&self, version: &str) -> Option<&ReleaseBuild> {
        self.builds
            .iter()
            .find(|b| b.version == version && b.prerelease.is_none())
    }
}

/// Platform directory name on the release server for this host.
pub fn current_platform() -> Option<&'static str> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => Some("linux-amd64"),
        ("macos", "x86_64") | ("macos", "aarch64") => Some("macosx-amd64"),
        ("windows", "x86_64") => Some("windows-amd64"),
        _ => None,
    }
}

/// Installs pinned `solc` releases on demand.
#[derive(Debug, Clone)]
pub struct SolcInstaller {
    install_dir: PathBuf,
    binaries_url: String,
    platform: Option<String>,
    http: reqwest::Client,
}

impl SolcInstaller {
    pub fn new(install_dir: PathBuf, binaries_url: String) -> Self {
        Self {
            install_dir,
            binaries_url: binaries_url.trim_end_matches('/').to_string(),
            platform: current_platform().map(str::to_string),
            http: reqwest::Client::new(),
        }
    }

    /// Override the platform directory (e.g., to mirror another host).
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Location of an installed release.
    pub fn binary_path(&self, version: &str) -> PathBuf {
        self.install_dir.join(format!("solc-{version}"))
    }

    /// Return the release, downloading it first when absent.
    pub async fn ensure(&self, version: &str) -> CompilerResult<Solc> {
        let target = self.binary_path(version);
        if target.is_file() {
            tracing::debug!(path = %target.display(), "Using installed compiler");
            return Ok(Solc::new(target));
        }

        let fail = |reason: String| CompilerError::Provisioning {
            version: version.to_string(),
            reason,
        };

        let platform = self
            .platform
            .as_deref()
            .ok_or_else(|| fail(format!(
                "no prebuilt compiler for {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            )))?;

        tracing::info!(version = version, platform = platform, "Installing compiler release");

        let list_url = format!("{}/{}/list.json", self.binaries_url, platform);
        let list: ReleaseList = self
            .get(&list_url)
            .await
            .map_err(&fail)?
            .json()
            .await
            .map_err(|e| fail(format!("invalid release list: {e}")))?;

        let build = list
            .find(version)
            .ok_or_else(|| fail(format!("version not published for {platform}")))?;

        let binary_url = format!("{}/{}/{}", self.binaries_url, platform, build.path);
        let bytes = self
            .get(&binary_url)
            .await
            .map_err(&fail)?
            .bytes()
            .await
            .map_err(|e| fail(format!("download interrupted: {e}")))?;

        let actual = hex::encode(keccak256(&bytes));
        let expected = build.keccak256.trim_start_matches("0x").to_ascii_lowercase();
        if actual != expected {
            return Err(fail(format!(
                "checksum mismatch: expected keccak256 {expected}, got {actual}"
            )));
        }

        self.write_binary(&target, &bytes).await?;
        tracing::info!(path = %target.display(), "Compiler installed");
        Ok(Solc::new(target))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, String> {
        self.http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| format!("GET {url} failed: {e}"))
    }

    async fn write_binary(&self, target: &Path, bytes: &[u8]) -> CompilerResult<()> {
        let io_err = |source| CompilerError::Io {
            path: target.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(&self.install_dir)
            .await
            .map_err(io_err)?;

        // Write next to the target and rename so a partial download is never picked up.
        let partial = PathBuf::from(format!("{}.partial", target.display()));
        tokio::fs::write(&partial, bytes).await.map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&partial, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(io_err)?;
        }

        tokio::fs::rename(&partial, target).await.map_err(io_err)
    }
}
