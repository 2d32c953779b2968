//! Core wallet functionality
//!
//! Cryptography, encrypted storage, session gating, fee estimation,
//! transaction signing and the `WalletEngine` façade that composes them.

pub mod crypto;
pub mod fees;
pub mod session;
pub mod storage;
pub mod transactions;
pub mod wallet;
