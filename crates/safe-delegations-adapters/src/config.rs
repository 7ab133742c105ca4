use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use safe_delegations_core::{Deployment, EnforcerAddressBook, PortError};

pub const ENV_DEPLOYMENT_FILE: &str = "SAFE_DELEGATIONS_DEPLOYMENT";
pub const ENV_CHAIN_ID: &str = "SAFE_DELEGATIONS_CHAIN_ID";
pub const ENV_DELEGATION_MANAGER: &str = "SAFE_DELEGATIONS_MANAGER";
pub const ENV_STORE_PATH: &str = "SAFE_DELEGATIONS_STORE";
pub const ENV_MAC_SECRET: &str = "SAFE_DELEGATIONS_MAC_SECRET";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid {var}: {reason}")]
    Env { var: &'static str, reason: String },
}

impl From<ConfigError> for PortError {
    fn from(e: ConfigError) -> Self {
        PortError::Validation(e.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelegationConfig {
    pub deployment: Deployment,
    pub store_path: Option<PathBuf>,
    pub import_max_bundle_bytes: usize,
    pub import_max_object_count: usize,
    pub mac_secret: String,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            deployment: Deployment {
                chain_id: 1,
                delegation_manager: Address::ZERO,
                enforcers: EnforcerAddressBook::new(),
            },
            store_path: None,
            import_max_bundle_bytes: 4 * 1024 * 1024,
            import_max_object_count: 2_000,
            mac_secret: "safe-delegations-mac-dev-secret".to_owned(),
        }
    }
}

impl DelegationConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Defaults, then the deployment file, then individual overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Ok(path) = std::env::var(ENV_DEPLOYMENT_FILE) {
            cfg.deployment = read_deployment(Path::new(&path))?;
            tracing::debug!(path = %path, "loaded deployment file");
        }
        if let Ok(raw) = std::env::var(ENV_CHAIN_ID) {
            cfg.deployment.chain_id = raw.trim().parse().map_err(|e| ConfigError::Env {
                var: ENV_CHAIN_ID,
                reason: format!("{e}"),
            })?;
        }
        if let Ok(raw) = std::env::var(ENV_DELEGATION_MANAGER) {
            cfg.deployment.delegation_manager =
                raw.trim().parse().map_err(|e| ConfigError::Env {
                    var: ENV_DELEGATION_MANAGER,
                    reason: format!("{e}"),
                })?;
        }
        if let Ok(path) = std::env::var(ENV_STORE_PATH) {
            cfg.store_path = Some(PathBuf::from(path));
        }
        if let Ok(secret) = std::env::var(ENV_MAC_SECRET) {
            cfg.mac_secret = secret;
        }
        Ok(cfg)
    }

    pub fn with_deployment(mut self, deployment: Deployment) -> Self {
        self.deployment = deployment;
        self
    }

    pub fn is_deployment_configured(&self) -> bool {
        self.deployment.delegation_manager != Address::ZERO && !self.deployment.enforcers.is_empty()
    }
}

pub fn read_deployment(path: &Path) -> Result<Deployment, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}
