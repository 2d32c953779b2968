//! Cryptographic functionality for the wallet core
//!
//! Key management, password-based key derivation and authenticated
//! encryption. Every buffer holding key material is zeroized on drop.

pub mod keys;
pub mod encryption;
pub mod password;

// Re-export all public items from submodules
pub use keys::*;
pub use encryption::*;
pub use password::*;
