//! Wallet configuration
//!
//! Layering, lowest to highest: built-in defaults, an optional
//! `emberkey.{toml,json,yaml}` file, then `EMBERKEY_*` environment variables
//! (`__` separates nested keys, e.g. `EMBERKEY_SESSION__TIMEOUT_MS`).
//! A `.env` file is loaded into the environment first.

use crate::core::crypto::password::KdfConfig;
use crate::core::session::SessionPolicy;
use crate::core::transactions::TransactionPolicy;
use crate::domain::NetworkConfig;
use crate::infrastructure::platform::FileStorage;
use crate::shared::constants::{CONFIG_ENV_PREFIX, CONFIG_FILE_NAME, DEFAULT_NETWORK_ID, DEFAULT_RPC_TIMEOUT_MS};
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use config::{Config, Environment, File, FileFormat, FileSourceFile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub default_network: String,
    pub networks: Vec<NetworkConfig>,
    pub kdf: KdfConfig,
    pub session: SessionPolicy,
    pub transactions: TransactionPolicy,
    pub rpc_timeout_ms: u64,
    /// Durable storage root; the platform data directory when unset
    pub storage_dir: Option<PathBuf>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            default_network: DEFAULT_NETWORK_ID.to_string(),
            networks: NetworkConfig::builtin(),
            kdf: KdfConfig::default(),
            session: SessionPolicy::default(),
            transactions: TransactionPolicy::default(),
            rpc_timeout_ms: DEFAULT_RPC_TIMEOUT_MS,
            storage_dir: None,
        }
    }
}

impl WalletConfig {
    /// Load from `emberkey.*` in the working directory (optional) and the environment
    pub fn load() -> WalletResult<Self> {
        Self::build(File::with_name(CONFIG_FILE_NAME).required(false))
    }

    /// Load from an explicit file, which must exist
    pub fn load_from(path: impl AsRef<Path>) -> WalletResult<Self> {
        Self::build(File::from(path.as_ref().to_path_buf()).required(true))
    }

    fn build(file: File<FileSourceFile, FileFormat>) -> WalletResult<Self> {
        dotenv::dotenv().ok();

        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: WalletConfig = settings.try_deserialize()?;
        config.validate()?;
        log::debug!("Loaded configuration, default network {}", config.default_network);
        Ok(config)
    }

    /// Look up a network by id
    pub fn network(&self, id: &str) -> WalletResult<&NetworkConfig> {
        self.networks
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| WalletError::config(format!("Unknown network: {}", id)))
    }

    pub fn default_network(&self) -> WalletResult<&NetworkConfig> {
        self.network(&self.default_network)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Durable file storage at `storage_dir`, or the platform default
    pub fn durable_storage(&self) -> WalletResult<FileStorage> {
        match &self.storage_dir {
            Some(dir) => FileStorage::with_root(dir),
            None => FileStorage::new(),
        }
    }

    pub fn validate(&self) -> WalletResult<()> {
        if self.networks.is_empty() {
            return Err(WalletError::config("At least one network must be configured"));
        }
        let mut seen = HashSet::new();
        for network in &self.networks {
            network.validate()?;
            if !seen.insert(network.id.as_str()) {
                return Err(WalletError::config(format!("Duplicate network id: {}", network.id)));
            }
        }
        self.default_network()?;

        if self.kdf.memory_kib < 8 * self.kdf.parallelism || self.kdf.iterations == 0 || self.kdf.parallelism == 0 {
            return Err(WalletError::config("Invalid KDF work factors"));
        }
        if self.session.timeout_ms == 0 {
            return Err(WalletError::config("Session timeout must be positive"));
        }
        if self.session.heartbeat_interval_ms >= self.session.timeout_ms {
            log::warn!(
                "Heartbeat interval {}ms is not shorter than the session timeout {}ms; sessions will expire between ticks",
                self.session.heartbeat_interval_ms,
                self.session.timeout_ms
            );
        }
        if self.transactions.confirmation_poll_ms == 0 {
            return Err(WalletError::config("Confirmation poll interval must be positive"));
        }
        if self.rpc_timeout_ms == 0 {
            return Err(WalletError::config("RPC timeout must be positive"));
        }
        Ok(())
    }
}
