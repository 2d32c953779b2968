use super::RpcClient;
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// JSON-RPC over HTTP POST
pub struct HttpRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> WalletResult<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(WalletError::config("RPC URL cannot be empty"));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn request(&self, method: &str, params: Value) -> WalletResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        log::debug!("RPC -> {} (id {})", method, id);

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::rpc(method, format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(WalletError::rpc(method, format!("HTTP status {}", resp.status())));
        }

        let parsed: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::rpc(method, format!("invalid response: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(WalletError::rpc(method, format!("{} (code {})", error.message, error.code)));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }
}
