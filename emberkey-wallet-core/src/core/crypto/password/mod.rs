//! Password-based key derivation for the wallet core
//!
//! Work factors and the Argon2id derivation of encryption keys.

pub mod kdf;
pub mod password_config;

// Re-export all public items from submodules
pub use kdf::*;
pub use password_config::*;
