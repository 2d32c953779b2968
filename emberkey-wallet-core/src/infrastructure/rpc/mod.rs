//! JSON-RPC collaborator
//!
//! `RpcClient` is the untyped request/response seam; `EthRpc` layers the
//! handful of typed `eth_*` calls the engine needs on top of it.

pub mod eth_rpc;
pub mod http_client;

pub use eth_rpc::*;
pub use http_client::*;

use crate::shared::types::WalletResult;
use async_trait::async_trait;
use serde_json::Value;

/// A JSON-RPC 2.0 transport.
///
/// Implementations return the `result` member (which may be `null`) and turn
/// a present `error` member into `WalletError::Rpc`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value>;
}
