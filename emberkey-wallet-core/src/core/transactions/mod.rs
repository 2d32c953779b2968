//! Transaction processing functionality
//!
//! Nonce, fee and gas resolution, EIP-1559 signing, funds validation,
//! broadcast and confirmation polling. The engine never authenticates: the
//! façade checks the session before calling in.

pub mod eip1559;
pub mod erc20;

pub use eip1559::*;
pub use erc20::*;

use crate::core::crypto::keys::KeyManager;
use crate::core::fees::FeeOracle;
use crate::infrastructure::rpc::EthRpc;
use crate::shared::constants::{DEFAULT_CONFIRMATIONS, DEFAULT_CONFIRMATION_POLL_MS, DEFAULT_CONFIRMATION_TIMEOUT_MS};
use crate::shared::error::WalletError;
use crate::shared::types::{SentTransaction, TransactionReceipt, TxHash, TxOverrides, WalletResult};
use crate::shared::utils::address_bytes;
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Confirmation and safety settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionPolicy {
    pub confirmation_poll_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub confirmations: u64,
    /// Compare `eth_chainId` with the configured chain before sending
    pub verify_chain_id: bool,
}

impl Default for TransactionPolicy {
    fn default() -> Self {
        Self {
            confirmation_poll_ms: DEFAULT_CONFIRMATION_POLL_MS,
            confirmation_timeout_ms: DEFAULT_CONFIRMATION_TIMEOUT_MS,
            confirmations: DEFAULT_CONFIRMATIONS,
            verify_chain_id: true,
        }
    }
}

/// A signed transaction that has not been broadcast
#[derive(Debug, Clone)]
pub struct PreparedTx {
    pub unsigned: UnsignedTx,
    pub signed: SignedTx,
}

/// Transaction manager for one network
pub struct TransactionEngine {
    rpc: EthRpc,
    fees: FeeOracle,
    chain_id: u64,
    policy: TransactionPolicy,
    // One resolve -> sign -> broadcast sequence at a time, so nonces never race
    send_lane: tokio::sync::Mutex<()>,
}

impl TransactionEngine {
    pub fn new(rpc: EthRpc, chain_id: u64, policy: TransactionPolicy) -> Self {
        Self {
            fees: FeeOracle::new(rpc.clone()),
            rpc,
            chain_id,
            policy,
            send_lane: tokio::sync::Mutex::new(()),
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn fee_oracle(&self) -> &FeeOracle {
        &self.fees
    }

    pub fn rpc(&self) -> &EthRpc {
        &self.rpc
    }

    pub fn policy(&self) -> &TransactionPolicy {
        &self.policy
    }

    /// Fails with `NetworkMismatch` when the endpoint serves another chain
    pub async fn verify_chain(&self) -> WalletResult<()> {
        let actual = self.rpc.chain_id().await?;
        if actual != self.chain_id {
            return Err(WalletError::NetworkMismatch {
                expected: self.chain_id,
                actual,
            });
        }
        Ok(())
    }

    /// Resolve nonce, fees and gas concurrently into an unsigned transaction
    pub async fn prepare(
        &self,
        from: &str,
        to: &str,
        value: U256,
        data: Vec<u8>,
        overrides: &TxOverrides,
    ) -> WalletResult<UnsignedTx> {
        let to_bytes = address_bytes(to)?;

        let nonce = async {
            match overrides.nonce {
                Some(nonce) => Ok(nonce),
                None => self.rpc.pending_nonce(from).await,
            }
        };
        let fees = async {
            match overrides.fees {
                Some(fees) => fees,
                None => self.fees.fee_data().await,
            }
        };
        let gas_limit = async {
            match overrides.gas_limit {
                Some(gas) => gas,
                None => self.fees.estimate_gas(from, to, value, &data).await,
            }
        };
        let (nonce, fees, gas_limit) = tokio::join!(nonce, fees, gas_limit);

        Ok(UnsignedTx {
            chain_id: self.chain_id,
            nonce: nonce?,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            max_fee_per_gas: fees.max_fee_per_gas,
            gas_limit,
            to: to_bytes,
            value,
            data,
        })
    }

    /// Sign an already resolved transaction
    pub fn sign(&self, keys: &KeyManager, unsigned: UnsignedTx) -> WalletResult<PreparedTx> {
        let signature = keys.sign_hash(&unsigned.sighash())?;
        let signed = SignedTx::new(unsigned.encode_signed(&signature));
        Ok(PreparedTx { unsigned, signed })
    }

    /// Resolve, encode and sign without broadcasting
    pub async fn build_and_sign(
        &self,
        keys: &KeyManager,
        to: &str,
        value: U256,
        data: Vec<u8>,
        overrides: &TxOverrides,
    ) -> WalletResult<PreparedTx> {
        let from = keys.address()?.to_string();
        let unsigned = self.prepare(&from, to, value, data, overrides).await?;
        self.sign(keys, unsigned)
    }

    /// Balance must cover `value + gas_limit * max_fee_per_gas`
    pub async fn validate_funds(&self, address: &str, value: U256, gas_limit: U256, max_fee_per_gas: U256) -> WalletResult<U256> {
        let required = gas_limit
            .checked_mul(max_fee_per_gas)
            .and_then(|gas| gas.checked_add(value))
            .ok_or_else(|| WalletError::validation("Transaction cost overflows"))?;
        let available = self.rpc.balance(address).await?;
        if available < required {
            return Err(WalletError::insufficient_funds(available, required));
        }
        Ok(available)
    }

    /// Submit once. Retrying is the caller's decision.
    pub async fn broadcast(&self, raw_hex: &str) -> WalletResult<TxHash> {
        let hash = self.rpc.send_raw_transaction(raw_hex).await.map_err(|e| match e {
            WalletError::Rpc { method, message } => WalletError::Rpc {
                method,
                message: format!("broadcast rejected: {}", message),
            },
            other => other,
        })?;
        log::info!("Broadcast transaction {}", hash);
        Ok(hash)
    }

    /// Resolve, check funds, sign and broadcast under the send lane
    pub async fn send(
        &self,
        keys: &KeyManager,
        to: &str,
        value: U256,
        data: Vec<u8>,
        overrides: &TxOverrides,
    ) -> WalletResult<SentTransaction> {
        let _lane = self.send_lane.lock().await;
        if self.policy.verify_chain_id {
            self.verify_chain().await?;
        }

        let from = keys.address()?.to_string();
        let unsigned = self.prepare(&from, to, value, data, overrides).await?;
        self.validate_funds(&from, unsigned.value, unsigned.gas_limit, unsigned.max_fee_per_gas)
            .await?;

        let prepared = self.sign(keys, unsigned)?;
        let raw = prepared.signed.raw_hex();
        let hash = self.broadcast(&raw).await?;
        if hash != prepared.signed.hash_hex() {
            log::warn!("Node returned hash {} for transaction {}", hash, prepared.signed.hash_hex());
        }
        Ok(SentTransaction {
            hash,
            raw,
            nonce: prepared.unsigned.nonce,
        })
    }

    /// ERC-20 `transfer` through the same path with `value = 0`
    pub async fn send_token(
        &self,
        keys: &KeyManager,
        token: &str,
        to: &str,
        amount: U256,
        overrides: &TxOverrides,
    ) -> WalletResult<SentTransaction> {
        let data = transfer_calldata(to, amount)?;
        self.send(keys, token, U256::zero(), data, overrides).await
    }

    /// Poll until the receipt is `confirmations` blocks deep or `timeout` elapses
    pub async fn wait_for_confirmation(&self, hash: &str, confirmations: u64, timeout: Duration) -> WalletResult<TransactionReceipt> {
        let depth = confirmations.max(1) - 1;
        let poll = Duration::from_millis(self.policy.confirmation_poll_ms.max(1));

        let polling = async {
            loop {
                match self.rpc.transaction_receipt(hash).await {
                    Ok(Some(receipt)) => match self.rpc.block_number().await {
                        Ok(current) if current.saturating_sub(receipt.block_number) >= depth => {
                            if !receipt.success {
                                log::warn!("Transaction {} reverted in block {}", hash, receipt.block_number);
                            }
                            return receipt;
                        }
                        Ok(current) => log::debug!(
                            "Transaction {} at block {}, head {}, waiting for {} confirmations",
                            hash,
                            receipt.block_number,
                            current,
                            confirmations
                        ),
                        Err(e) => log::debug!("Block number poll failed: {}", e),
                    },
                    Ok(None) => log::debug!("Transaction {} still pending", hash),
                    Err(e) => log::debug!("Receipt poll failed: {}", e),
                }
                tokio::time::sleep(poll).await;
            }
        };

        tokio::time::timeout(timeout, polling)
            .await
            .map_err(|_| WalletError::ConfirmationTimeout {
                hash: hash.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::constants::PRIVATE_KEY_SIZE;
    use crate::shared::types::FeeEstimate;
    use crate::test_utils::ScriptedRpc;
    use serde_json::json;
    use std::sync::Arc;

    const GWEI: u64 = 1_000_000_000;
    const TO: &str = "0x3535353535353535353535353535353535353535";
    const FROM: &str = "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f";

    const VECTOR_1: &str = "0x02f86b010984773594008506fc23ac008252089435353535353535353535353535353535353535358080c001a007743cef8ac4cc58165f08172e6e1749cc31287d22af16e473ea47e26fae2499a06467e8f4bc8605cb4cbbc77d546b591b1eb3fa8c391008474e3b98cb40a2ec72";
    const VECTOR_1_HASH: &str = "0x95e7cbef8455488dd8aadb84fd2e7a27d1cc96c6db1e0ffd85b7dcc859338698";

    fn keys() -> KeyManager {
        let mut km = KeyManager::new();
        km.load_private_key([0x46; PRIVATE_KEY_SIZE]).expect("Failed to load test key");
        km
    }

    fn engine(rpc: Arc<ScriptedRpc>, chain_id: u64) -> TransactionEngine {
        TransactionEngine::new(EthRpc::new(rpc), chain_id, TransactionPolicy::default())
    }

    fn vector_1_overrides() -> TxOverrides {
        TxOverrides {
            nonce: Some(U256::from(9u64)),
            gas_limit: Some(U256::from(21_000u64)),
            fees: Some(FeeEstimate {
                max_fee_per_gas: U256::from(30 * GWEI),
                max_priority_fee_per_gas: U256::from(2 * GWEI),
            }),
        }
    }

    #[tokio::test]
    async fn test_build_and_sign_vector_1() {
        let rpc = Arc::new(ScriptedRpc::new());
        let engine = engine(rpc.clone(), 1);
        let prepared = engine
            .build_and_sign(&keys(), TO, U256::zero(), Vec::new(), &vector_1_overrides())
            .await
            .expect("Failed to sign");
        assert_eq!(prepared.signed.raw_hex(), VECTOR_1);
        assert_eq!(prepared.signed.hash_hex(), VECTOR_1_HASH);
        assert_eq!(rpc.call_count(), 0);
    }

    #[tokio::test]
    async fn test_build_and_sign_vector_2() {
        let overrides = TxOverrides {
            nonce: Some(U256::zero()),
            gas_limit: Some(U256::from(21_000u64)),
            fees: Some(FeeEstimate {
                max_fee_per_gas: U256::from(3 * GWEI),
                max_priority_fee_per_gas: U256::from(1_500_000_000u64),
            }),
        };
        let engine = engine(Arc::new(ScriptedRpc::new()), 11155111);
        let prepared = engine
            .build_and_sign(&keys(), TO, U256::exp10(18), Vec::new(), &overrides)
            .await
            .expect("Failed to sign");
        assert_eq!(
            prepared.signed.raw_hex(),
            "0x02f87583aa36a7808459682f0084b2d05e00825208943535353535353535353535353535353535353535880de0b6b3a764000080c001a0da98c406e6beaa053da71c7ea4ea925bb1c57ec97a8dd0651a1a0a81251fcb2aa01586d32a19d673e6c8e9092bcb820777c65eef433893c574748f1a74f99c7931"
        );
        assert_eq!(
            prepared.signed.hash_hex(),
            "0x20305e2449b4a56ca85a5ad20f1cc3923230f34188a8d418d4c74602a3646a55"
        );
    }

    #[tokio::test]
    async fn test_token_transfer_vector() {
        let overrides = TxOverrides {
            nonce: Some(U256::from(3u64)),
            gas_limit: Some(U256::from(65_000u64)),
            fees: Some(FeeEstimate {
                max_fee_per_gas: U256::from(20 * GWEI),
                max_priority_fee_per_gas: U256::from(GWEI),
            }),
        };
        let engine = engine(Arc::new(ScriptedRpc::new()), 1);
        let data = transfer_calldata(TO, U256::from(1_000_000u64)).expect("Failed to encode transfer");
        let prepared = engine
            .build_and_sign(&keys(), TO, U256::zero(), data, &overrides)
            .await
            .expect("Failed to sign");
        assert_eq!(
            prepared.signed.raw_hex(),
            "0x02f8b00103843b9aca008504a817c80082fde894353535353535353535353535353535353535353580b844a9059cbb000000000000000000000000353535353535353535353535353535353535353500000000000000000000000000000000000000000000000000000000000f4240c001a0a32475e18882f7eabcd9b3bae81e1fca914fe1a22f581c1767576208eba0ba79a038d418c8b590614e64a23ae37ae8cf0c109b9512a8e5a01c431060a809a4b4b1"
        );
        assert_eq!(
            prepared.signed.hash_hex(),
            "0xc39a1553e075c5341b84c75d78bb875ea9a13eccd14c6e936883b4776bb0706c"
        );
    }

    #[tokio::test]
    async fn test_prepare_resolves_from_rpc() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                .on("eth_getTransactionCount", json!("0x9"))
                .on("eth_feeHistory", json!({ "baseFeePerGas": ["0x2540be400"], "reward": [["0x77359400", "0x77359400"]] }))
                .on("eth_estimateGas", json!("0x5208")),
        );
        let engine = engine(rpc.clone(), 1);
        let unsigned = engine
            .prepare(FROM, TO, U256::one(), Vec::new(), &TxOverrides::default())
            .await
            .expect("Failed to prepare");
        assert_eq!(unsigned.nonce, U256::from(9u64));
        assert_eq!(unsigned.gas_limit, U256::from(25_200u64));
        assert_eq!(unsigned.max_priority_fee_per_gas, U256::from(2 * GWEI));
        assert_eq!(unsigned.max_fee_per_gas, U256::from(14 * GWEI));
        assert_eq!(rpc.call_count(), 3);
    }

    #[tokio::test]
    async fn test_nonce_failure_is_surfaced() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                .on_error("eth_getTransactionCount", "node down")
                .on("eth_gasPrice", json!("0x1"))
                .on("eth_estimateGas", json!("0x5208")),
        );
        let err = engine(rpc, 1)
            .prepare(FROM, TO, U256::one(), Vec::new(), &TxOverrides::default())
            .await
            .expect_err("nonce failure should propagate");
        assert!(matches!(err, WalletError::Rpc { ref method, .. } if method == "eth_getTransactionCount"));
    }

    #[tokio::test]
    async fn test_validate_funds_boundary() {
        let exact = Arc::new(ScriptedRpc::new().on("eth_getBalance", json!("0x23cfb4e356000")));
        engine(exact, 1)
            .validate_funds(FROM, U256::zero(), U256::from(21_000u64), U256::from(30 * GWEI))
            .await
            .expect("Exact balance should pass");

        let short = Arc::new(ScriptedRpc::new().on("eth_getBalance", json!("0x23cfb4e355fff")));
        let err = engine(short, 1)
            .validate_funds(FROM, U256::zero(), U256::from(21_000u64), U256::from(30 * GWEI))
            .await
            .expect_err("Short balance should fail");
        match err {
            WalletError::InsufficientFunds { shortfall, .. } => assert_eq!(shortfall, U256::one()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_broadcasts_vector() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                .on("eth_chainId", json!("0x1"))
                .on("eth_getBalance", json!("0xde0b6b3a7640000"))
                .on("eth_sendRawTransaction", json!(VECTOR_1_HASH)),
        );
        let sent = engine(rpc.clone(), 1)
            .send(&keys(), TO, U256::zero(), Vec::new(), &vector_1_overrides())
            .await
            .expect("Failed to send");
        assert_eq!(sent.hash, VECTOR_1_HASH);
        assert_eq!(sent.raw, VECTOR_1);

        let methods: Vec<String> = rpc.calls().into_iter().map(|(m, _)| m).collect();
        assert_eq!(methods, vec!["eth_chainId", "eth_getBalance", "eth_sendRawTransaction"]);
        assert_eq!(rpc.calls()[2].1, json!([VECTOR_1]));
    }

    #[tokio::test]
    async fn test_concurrent_sends_are_serialized() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                .on("eth_chainId", json!("0x1"))
                .on("eth_getTransactionCount", json!("0x0"))
                .then("eth_getTransactionCount", json!("0x1"))
                .on("eth_getBalance", json!("0xde0b6b3a7640000"))
                .on("eth_sendRawTransaction", json!(VECTOR_1_HASH)),
        );
        let engine = engine(rpc.clone(), 1);
        let keys = keys();
        let overrides = TxOverrides {
            nonce: None,
            ..vector_1_overrides()
        };

        let (first, second) = tokio::join!(
            engine.send(&keys, TO, U256::one(), Vec::new(), &overrides),
            engine.send(&keys, TO, U256::from(2u64), Vec::new(), &overrides),
        );
        let first = first.expect("Failed to send first transaction");
        let second = second.expect("Failed to send second transaction");
        assert_eq!(first.nonce, U256::zero());
        assert_eq!(second.nonce, U256::one());
        assert_ne!(first.raw, second.raw);

        let methods: Vec<String> = rpc.calls().into_iter().map(|(m, _)| m).collect();
        let one_send = ["eth_chainId", "eth_getTransactionCount", "eth_getBalance", "eth_sendRawTransaction"];
        assert_eq!(methods, [one_send, one_send].concat());
        assert_eq!(rpc.calls()[3].1, json!([first.raw]));
        assert_eq!(rpc.calls()[7].1, json!([second.raw]));
    }

    #[tokio::test]
    async fn test_send_stops_before_broadcast_when_short() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                .on("eth_chainId", json!("0x1"))
                .on("eth_getBalance", json!("0x0"))
                .on("eth_sendRawTransaction", json!(VECTOR_1_HASH)),
        );
        let err = engine(rpc.clone(), 1)
            .send(&keys(), TO, U256::zero(), Vec::new(), &vector_1_overrides())
            .await
            .expect_err("send should fail");
        assert!(matches!(err, WalletError::InsufficientFunds { .. }));
        assert_eq!(rpc.count_of("eth_sendRawTransaction"), 0);
    }

    #[tokio::test]
    async fn test_send_rejects_wrong_chain() {
        let rpc = Arc::new(ScriptedRpc::new().on("eth_chainId", json!("0xaa36a7")));
        let err = engine(rpc.clone(), 1)
            .send(&keys(), TO, U256::zero(), Vec::new(), &vector_1_overrides())
            .await
            .expect_err("send should fail");
        assert!(matches!(err, WalletError::NetworkMismatch { expected: 1, actual: 11155111 }));
        assert_eq!(rpc.call_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_does_not_retry() {
        let rpc = Arc::new(ScriptedRpc::new().on_error("eth_sendRawTransaction", "nonce too low"));
        let err = engine(rpc.clone(), 1).broadcast(VECTOR_1).await.expect_err("broadcast should fail");
        assert!(err.to_string().contains("nonce too low"));
        assert_eq!(rpc.count_of("eth_sendRawTransaction"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_confirmation() {
        let rpc = Arc::new(
            ScriptedRpc::new()
                .on("eth_getTransactionReceipt", json!(null))
                .then("eth_getTransactionReceipt", json!(null))
                .then("eth_getTransactionReceipt", json!({ "blockNumber": "0x64", "status": "0x1" }))
                .on("eth_blockNumber", json!("0x64"))
                .then("eth_blockNumber", json!("0x65"))
                .then("eth_blockNumber", json!("0x66")),
        );
        let receipt = engine(rpc.clone(), 1)
            .wait_for_confirmation(VECTOR_1_HASH, 3, Duration::from_secs(60))
            .await
            .expect("Failed to confirm");
        assert_eq!(receipt.block_number, 100);
        assert!(receipt.success);
        assert_eq!(rpc.count_of("eth_blockNumber"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_confirmation_times_out() {
        let rpc = Arc::new(ScriptedRpc::new().on("eth_getTransactionReceipt", json!(null)));
        let err = engine(rpc.clone(), 1)
            .wait_for_confirmation(VECTOR_1_HASH, 1, Duration::from_secs(10))
            .await
            .expect_err("wait should time out");
        assert!(matches!(err, WalletError::ConfirmationTimeout { timeout_ms: 10_000, .. }));
        // Polled roughly every 2 s within the window
        let polls = rpc.count_of("eth_getTransactionReceipt");
        assert!((5..=6).contains(&polls), "unexpected poll count {polls}");
    }
}
