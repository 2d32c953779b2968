use super::RpcClient;
use crate::shared::error::WalletError;
use crate::shared::types::{BlockNumber, TransactionReceipt, TxHash, WalletResult};
use crate::shared::utils::{decode_hex, format_quantity, parse_quantity, parse_quantity_u64, to_hex_prefixed};
use ethers::types::U256;
use serde_json::{json, Value};
use std::sync::Arc;

/// Result of `eth_feeHistory`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeHistory {
    /// One entry per sampled block plus the next pending block
    pub base_fee_per_gas: Vec<U256>,
    /// Per block, one reward per requested percentile
    pub reward: Vec<Vec<U256>>,
}

/// Typed `eth_*` calls over any [`RpcClient`]
#[derive(Clone)]
pub struct EthRpc {
    client: Arc<dyn RpcClient>,
}

impl EthRpc {
    pub fn new(client: Arc<dyn RpcClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<dyn RpcClient> {
        &self.client
    }

    pub async fn chain_id(&self) -> WalletResult<u64> {
        let value = self.client.request("eth_chainId", json!([])).await?;
        parse_quantity_u64(expect_str("eth_chainId", &value)?)
    }

    pub async fn block_number(&self) -> WalletResult<BlockNumber> {
        let value = self.client.request("eth_blockNumber", json!([])).await?;
        parse_quantity_u64(expect_str("eth_blockNumber", &value)?)
    }

    pub async fn gas_price(&self) -> WalletResult<U256> {
        let value = self.client.request("eth_gasPrice", json!([])).await?;
        parse_quantity(expect_str("eth_gasPrice", &value)?)
    }

    pub async fn fee_history(&self, blocks: u64, percentiles: &[f64]) -> WalletResult<FeeHistory> {
        let method = "eth_feeHistory";
        let value = self
            .client
            .request(method, json!([format_quantity(U256::from(blocks)), "latest", percentiles]))
            .await?;

        let base_fee_per_gas = value
            .get("baseFeePerGas")
            .and_then(Value::as_array)
            .ok_or_else(|| WalletError::rpc(method, "missing baseFeePerGas"))?
            .iter()
            .map(|v| parse_quantity(expect_str(method, v)?))
            .collect::<WalletResult<Vec<_>>>()?;

        let reward = match value.get("reward").and_then(Value::as_array) {
            Some(rows) => rows
                .iter()
                .map(|row| {
                    row.as_array()
                        .ok_or_else(|| WalletError::rpc(method, "malformed reward row"))?
                        .iter()
                        .map(|v| parse_quantity(expect_str(method, v)?))
                        .collect::<WalletResult<Vec<_>>>()
                })
                .collect::<WalletResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(FeeHistory { base_fee_per_gas, reward })
    }

    pub async fn estimate_gas(&self, from: &str, to: &str, value: U256, data: &[u8]) -> WalletResult<U256> {
        let mut call = json!({
            "from": from,
            "to": to,
            "value": format_quantity(value),
        });
        if !data.is_empty() {
            call["data"] = Value::String(to_hex_prefixed(data));
        }
        let result = self.client.request("eth_estimateGas", json!([call])).await?;
        parse_quantity(expect_str("eth_estimateGas", &result)?)
    }

    /// Nonce including pending transactions
    pub async fn pending_nonce(&self, address: &str) -> WalletResult<U256> {
        let value = self
            .client
            .request("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_quantity(expect_str("eth_getTransactionCount", &value)?)
    }

    pub async fn balance(&self, address: &str) -> WalletResult<U256> {
        let value = self.client.request("eth_getBalance", json!([address, "latest"])).await?;
        parse_quantity(expect_str("eth_getBalance", &value)?)
    }

    pub async fn call(&self, to: &str, data: &[u8]) -> WalletResult<Vec<u8>> {
        let value = self
            .client
            .request("eth_call", json!([{ "to": to, "data": to_hex_prefixed(data) }, "latest"]))
            .await?;
        decode_hex(expect_str("eth_call", &value)?)
    }

    pub async fn send_raw_transaction(&self, raw: &str) -> WalletResult<TxHash> {
        let value = self.client.request("eth_sendRawTransaction", json!([raw])).await?;
        Ok(expect_str("eth_sendRawTransaction", &value)?.to_ascii_lowercase())
    }

    /// `None` while the transaction is still pending
    pub async fn transaction_receipt(&self, hash: &str) -> WalletResult<Option<TransactionReceipt>> {
        let method = "eth_getTransactionReceipt";
        let value = self.client.request(method, json!([hash])).await?;
        if value.is_null() {
            return Ok(None);
        }
        let block_number = match value.get("blockNumber").and_then(Value::as_str) {
            Some(raw) => parse_quantity_u64(raw)?,
            // Some nodes return a receipt shell before the block is sealed
            None => return Ok(None),
        };
        let success = value.get("status").and_then(Value::as_str).map_or(true, |s| s == "0x1");
        let gas_used = value
            .get("gasUsed")
            .and_then(Value::as_str)
            .map(parse_quantity)
            .transpose()?;
        Ok(Some(TransactionReceipt {
            transaction_hash: hash.to_string(),
            block_number,
            success,
            gas_used,
        }))
    }
}

fn expect_str<'a>(method: &str, value: &'a Value) -> WalletResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| WalletError::rpc(method, format!("unexpected result: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rpc::MockRpcClient;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_chain_id() {
        let mut mock = MockRpcClient::new();
        mock.expect_request()
            .with(eq("eth_chainId"), eq(json!([])))
            .times(1)
            .returning(|_, _| Ok(json!("0xaa36a7")));
        let rpc = EthRpc::new(Arc::new(mock));
        assert_eq!(rpc.chain_id().await.expect("Failed to read chain id"), 11155111);
    }

    #[tokio::test]
    async fn test_fee_history_parsing() {
        let mut mock = MockRpcClient::new();
        mock.expect_request()
            .with(eq("eth_feeHistory"), eq(json!(["0x4", "latest", [25.0, 75.0]])))
            .returning(|_, _| {
                Ok(json!({
                    "oldestBlock": "0x10",
                    "baseFeePerGas": ["0x1", "0x2", "0x3", "0x4", "0x5"],
                    "reward": [["0xa", "0xb"], ["0xc", "0xd"], ["0xe", "0xf"], ["0x10", "0x11"]]
                }))
            });
        let rpc = EthRpc::new(Arc::new(mock));
        let history = rpc.fee_history(4, &[25.0, 75.0]).await.expect("Failed to read fee history");
        assert_eq!(history.base_fee_per_gas.len(), 5);
        assert_eq!(history.base_fee_per_gas[4], U256::from(5u64));
        assert_eq!(history.reward[3], vec![U256::from(16u64), U256::from(17u64)]);
    }

    #[tokio::test]
    async fn test_pending_receipt_is_none() {
        let mut mock = MockRpcClient::new();
        mock.expect_request().returning(|_, _| Ok(Value::Null));
        let rpc = EthRpc::new(Arc::new(mock));
        assert!(rpc.transaction_receipt("0xabc").await.expect("Failed to poll").is_none());
    }

    #[tokio::test]
    async fn test_receipt_parsing() {
        let mut mock = MockRpcClient::new();
        mock.expect_request().returning(|_, _| {
            Ok(json!({ "blockNumber": "0x64", "status": "0x0", "gasUsed": "0x5208" }))
        });
        let rpc = EthRpc::new(Arc::new(mock));
        let receipt = rpc
            .transaction_receipt("0xabc")
            .await
            .expect("Failed to poll")
            .expect("receipt should be present");
        assert_eq!(receipt.block_number, 100);
        assert!(!receipt.success);
        assert_eq!(receipt.gas_used, Some(U256::from(21000u64)));
    }

    #[tokio::test]
    async fn test_malformed_result_is_rpc_error() {
        let mut mock = MockRpcClient::new();
        mock.expect_request().returning(|_, _| Ok(json!(42)));
        let rpc = EthRpc::new(Arc::new(mock));
        let err = rpc.gas_price().await.expect_err("numeric result should be rejected");
        assert!(matches!(err, WalletError::Rpc { .. }));
    }
}
