//! Error handling for the wallet core
//!
//! This module defines the error types used throughout the wallet core,
//! and the structured failure handed back across the `WalletEngine` boundary.

use ethers::types::U256;
use serde::Serialize;
use thiserror::Error;

/// Wallet error type
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key manager is not initialized")]
    NotInitialized,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("session expired")]
    SessionExpired,

    /// Wrong password and corrupted ciphertext are deliberately reported the same way.
    #[error("decryption failed")]
    DecryptionFailed,

    #[error("Insufficient funds: available {available}, required {required}, shortfall {shortfall}")]
    InsufficientFunds {
        available: U256,
        required: U256,
        shortfall: U256,
    },

    #[error("RPC error in {method}: {message}")]
    Rpc { method: String, message: String },

    #[error("Transaction {hash} not confirmed within {timeout_ms} ms")]
    ConfirmationTimeout { hash: String, timeout_ms: u64 },

    #[error("Network mismatch: expected chain {expected}, endpoint reports {actual}")]
    NetworkMismatch { expected: u64, actual: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Wallet already exists: {0}")]
    WalletAlreadyExists(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Create an invalid mnemonic error
    pub fn invalid_mnemonic(message: impl Into<String>) -> Self {
        Self::InvalidMnemonic(message.into())
    }

    /// Create an RPC error for the given method
    pub fn rpc(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an insufficient funds error, computing the shortfall
    pub fn insufficient_funds(available: U256, required: U256) -> Self {
        Self::InsufficientFunds {
            available,
            required,
            shortfall: required.saturating_sub(available),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a cryptographic error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a wallet not found error
    pub fn wallet_not_found(message: impl Into<String>) -> Self {
        Self::WalletNotFound(message.into())
    }

    /// Create a wallet already exists error
    pub fn wallet_already_exists(message: impl Into<String>) -> Self {
        Self::WalletAlreadyExists(message.into())
    }

    /// Create a transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Coarse classification used at the façade boundary
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMnemonic(_) => ErrorKind::InvalidMnemonic,
            Self::NotInitialized => ErrorKind::NotInitialized,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::DecryptionFailed => ErrorKind::DecryptionFailed,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::Rpc { .. } => ErrorKind::Rpc,
            Self::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            Self::NetworkMismatch { .. } => ErrorKind::NetworkMismatch,
            Self::Config(_) => ErrorKind::Config,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Network(_) => ErrorKind::Network,
            Self::WalletNotFound(_) => ErrorKind::WalletNotFound,
            Self::WalletAlreadyExists(_) => ErrorKind::WalletAlreadyExists,
            Self::Transaction(_) => ErrorKind::Transaction,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Discriminant of [`WalletError`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidMnemonic,
    NotInitialized,
    NotAuthenticated,
    SessionExpired,
    DecryptionFailed,
    InsufficientFunds,
    Rpc,
    ConfirmationTimeout,
    NetworkMismatch,
    Config,
    Crypto,
    Validation,
    Storage,
    Network,
    WalletNotFound,
    WalletAlreadyExists,
    Transaction,
    Internal,
}

/// Structured failure returned by every `WalletEngine` operation.
///
/// `message` is always human readable and never carries key material.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct OperationFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<WalletError> for OperationFailure {
    fn from(err: WalletError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of a `WalletEngine` operation
pub type OperationResult<T> = Result<T, OperationFailure>;

// Standard library error conversions
impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(format!("IO error: {}", err))
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        Self::validation(format!("Hex decoding error: {}", err))
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("JSON error: {}", err))
    }
}

impl From<base64::DecodeError> for WalletError {
    fn from(err: base64::DecodeError) -> Self {
        Self::storage(format!("Base64 decoding error: {}", err))
    }
}

impl From<tokio::task::JoinError> for WalletError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("Task join error: {}", err))
    }
}

impl From<config::ConfigError> for WalletError {
    fn from(err: config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(format!("HTTP error: {}", err))
    }
}

// Cryptographic error conversions
impl From<secp256k1::Error> for WalletError {
    fn from(err: secp256k1::Error) -> Self {
        Self::crypto(format!("Secp256k1 error: {}", err))
    }
}

impl From<argon2::Error> for WalletError {
    fn from(err: argon2::Error) -> Self {
        Self::crypto(format!("Argon2 error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_error_creation() {
        let config_error = WalletError::config("Invalid configuration");
        let crypto_error = WalletError::crypto("Encryption failed");
        let rpc_error = WalletError::rpc("eth_gasPrice", "timeout");

        assert!(matches!(config_error, WalletError::Config(_)));
        assert!(matches!(crypto_error, WalletError::Crypto(_)));
        assert!(matches!(rpc_error, WalletError::Rpc { ref method, .. } if method == "eth_gasPrice"));
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let wallet_error: WalletError = io_error.into();

        assert!(matches!(wallet_error, WalletError::Storage(_)));
    }

    #[test]
    fn test_insufficient_funds_shortfall() {
        let err = WalletError::insufficient_funds(U256::from(40u64), U256::from(100u64));
        match err {
            WalletError::InsufficientFunds { available, required, shortfall } => {
                assert_eq!(available, U256::from(40u64));
                assert_eq!(required, U256::from(100u64));
                assert_eq!(shortfall, U256::from(60u64));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decryption_failure_is_opaque() {
        assert_eq!(WalletError::DecryptionFailed.to_string(), "decryption failed");
    }

    #[test]
    fn test_operation_failure_from_error() {
        let failure = OperationFailure::from(WalletError::NotAuthenticated);
        assert_eq!(failure.kind, ErrorKind::NotAuthenticated);
        assert_eq!(failure.message, "not authenticated");
    }
}
