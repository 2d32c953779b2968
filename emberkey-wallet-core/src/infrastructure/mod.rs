//! Infrastructure layer
//!
//! Persistence backends, the JSON-RPC client and configuration loading.

pub mod config;
pub mod platform;
pub mod rpc;

// Re-export infrastructure components
pub use config::*;
pub use platform::*;
pub use rpc::*;
