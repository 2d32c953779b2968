//! Encryption functionality for the wallet core
//!
//! This module handles AES-256-GCM sealing of the mnemonic at rest.

pub mod encryption_manager;
pub mod encrypted_data;

// Re-export all public items from submodules
pub use encryption_manager::*;
pub use encrypted_data::*;
