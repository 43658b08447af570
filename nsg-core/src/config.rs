// SPDX-License-Identifier: AGPL-3.0-or-later
//! Gateway configuration
//!
//! Loaded from a TOML file. Every section is optional; missing values fall
//! back to a local namespace rooted at the working directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{NsgError, NsgResult};

/// Default WebHDFS request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default size of the block used when streaming staged buffers
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub namespace: NamespaceConfig,
    pub staging: StagingConfig,
    pub errors: ErrorConfig,
}

/// Which namespace client to open at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    WebHdfs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    pub backend: BackendKind,
    /// Namenode HTTP address, e.g. `http://node1:9870`
    pub url: String,
    /// User name passed as `user.name`
    pub user: String,
    pub timeout_secs: u64,
    /// Root directory for the local backend
    pub root: PathBuf,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            url: "http://localhost:9870".into(),
            user: "root".into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Directory for staged buffers; the OS temp dir when unset
    pub dir: Option<PathBuf>,
    pub block_size: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self { dir: None, block_size: DEFAULT_BLOCK_SIZE }
    }
}

impl StagingConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Map failure kinds to distinct status codes instead of a uniform 400
    pub strict_status: bool,
}

impl GatewayConfig {
    /// Default config file location for this user
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "nsg", "namespace-gateway")
            .map(|d| d.config_dir().join("config.toml"))
    }

    pub fn from_toml(text: &str) -> NsgResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| NsgError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> NsgResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(NsgError::Config(format!("{}: {e}", path.display()))),
        }
    }

    /// Load from `path` if given, else from [`GatewayConfig::default_path`]
    pub fn load_or_default(path: Option<&Path>) -> NsgResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => match Self::default_path() {
                Some(p) => Self::load(&p),
                None => Ok(Self::default()),
            },
        }
    }

    fn validate(&self) -> NsgResult<()> {
        if self.staging.block_size == 0 {
            return Err(NsgError::Config("staging.block_size must be positive".into()));
        }
        if self.namespace.backend == BackendKind::WebHdfs && self.namespace.url.trim().is_empty() {
            return Err(NsgError::Config("namespace.url is required for webhdfs".into()));
        }
        Ok(())
    }
}
