//! Emberkey Wallet Core
//!
//! Self-custodial EVM wallet engine.
//! Handles key derivation, encrypted mnemonic storage, session gating and
//! EIP-1559 transaction signing in Rust.
//!
//! ## Architecture
//!
//! - **Core**: key manager, encrypted store, session authority, fee oracle,
//!   transaction engine and the `WalletEngine` façade
//! - **Domain**: wallet record, session and network entities
//! - **Infrastructure**: storage backends, JSON-RPC client, configuration
//! - **Shared**: common types, constants, errors and utilities
//!
//! ## Security Features
//!
//! - Key material is zeroized on drop and overwritten with random bytes on wipe
//! - Mnemonic sealed with Argon2id + AES-256-GCM, fresh salt and nonce per write
//! - Every signing path requires a live session
//!
//! ## Usage
//!
//! ```rust,no_run
//! use emberkey_wallet_core::{init_wallet_engine, WalletConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = init_wallet_engine(WalletConfig::load()?)?;
//! let created = engine.create_wallet("correct horse battery").await?;
//! println!("Wallet address: {}", created.address);
//!
//! let signature = engine.sign_message(b"hello").await?;
//! println!("Signature: {}", signature);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
mod test_utils;

// Re-export specific components
pub use crate::core::crypto::keys::{KeyManager, SecureSeedPhrase};
pub use crate::core::fees::FeeOracle;
pub use crate::core::session::{ActivityEvent, SessionAuthority, SessionPolicy, SessionState};
pub use crate::core::storage::EncryptedStore;
pub use crate::core::transactions::{TransactionEngine, TransactionPolicy};
pub use crate::core::wallet::{RpcFactory, WalletEngine};

// Re-export domain entities
pub use crate::domain::{NetworkConfig, WalletInfo};

// Re-export infrastructure
pub use crate::infrastructure::config::WalletConfig;
pub use crate::infrastructure::rpc::{HttpRpcClient, RpcClient};

// Re-export shared types
pub use crate::shared::error::{ErrorKind, OperationFailure, OperationResult, WalletError};
pub use crate::shared::types::{CreatedWallet, FeeEstimate, MnemonicStrength, SentTransaction, TransactionReceipt, TxOverrides};

/// Initialize logging from `RUST_LOG`, defaulting to `info`
pub fn init() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build a `WalletEngine` on file storage and HTTP JSON-RPC
pub fn init_wallet_engine(config: WalletConfig) -> Result<WalletEngine, WalletError> {
    init();
    log::info!("{} v{} starting", NAME, VERSION);
    WalletEngine::new(config)
}
