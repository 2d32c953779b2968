//! Network entity for the wallet core

use serde::{Deserialize, Serialize};

use crate::shared::error::WalletError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NativeCurrency {
    pub symbol: String,
    pub decimals: u32,
}

impl NativeCurrency {
    pub fn ether() -> Self {
        Self {
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

/// Immutable per-network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub id: String,
    pub chain_id: u64,
    pub rpc_url: String,
    #[serde(default)]
    pub explorer_api_url: String,
    #[serde(default)]
    pub explorer_api_key: Option<String>,
    pub native_currency: NativeCurrency,
}

impl NetworkConfig {
    pub fn mainnet() -> Self {
        Self {
            id: "mainnet".to_string(),
            chain_id: 1,
            rpc_url: "https://ethereum-rpc.publicnode.com".to_string(),
            explorer_api_url: "https://api.etherscan.io".to_string(),
            explorer_api_key: None,
            native_currency: NativeCurrency::ether(),
        }
    }

    pub fn sepolia() -> Self {
        Self {
            id: "sepolia".to_string(),
            chain_id: 11155111,
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            explorer_api_url: "https://api-sepolia.etherscan.io".to_string(),
            explorer_api_key: None,
            native_currency: NativeCurrency::ether(),
        }
    }

    pub fn base_sepolia() -> Self {
        Self {
            id: "base-sepolia".to_string(),
            chain_id: 84532,
            rpc_url: "https://sepolia.base.org".to_string(),
            explorer_api_url: "https://api-sepolia.basescan.org".to_string(),
            explorer_api_key: None,
            native_currency: NativeCurrency::ether(),
        }
    }

    pub fn core_testnet() -> Self {
        Self {
            id: "core-testnet".to_string(),
            chain_id: 1114,
            rpc_url: "https://rpc.test2.btcs.network".to_string(),
            explorer_api_url: "https://scan.test2.btcs.network".to_string(),
            explorer_api_key: None,
            native_currency: NativeCurrency {
                symbol: "tCORE2".to_string(),
                decimals: 18,
            },
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::mainnet(), Self::sepolia(), Self::base_sepolia(), Self::core_testnet()]
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.id.is_empty() {
            return Err(WalletError::config("Network id cannot be empty"));
        }
        if self.chain_id == 0 {
            return Err(WalletError::config(format!("Network {} has chain id 0", self.id)));
        }
        if !(self.rpc_url.starts_with("http://") || self.rpc_url.starts_with("https://")) {
            return Err(WalletError::config(format!(
                "Network {} has an invalid RPC URL",
                self.id
            )));
        }
        Ok(())
    }
}
