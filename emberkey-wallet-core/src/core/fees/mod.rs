//! Fee and gas estimation
//!
//! `fee_data` and `estimate_gas` never fail: RPC trouble degrades to
//! conservative defaults and a warning in the log.

use crate::infrastructure::rpc::EthRpc;
use crate::shared::constants::{
    CONTRACT_CALL_GAS_LIMIT, DEFAULT_GAS_PRICE, FEE_HISTORY_BLOCKS, FEE_HISTORY_PERCENTILES, GAS_MARGIN_DENOMINATOR,
    GAS_MARGIN_NUMERATOR, MIN_PRIORITY_FEE, TRANSFER_GAS_LIMIT,
};
use crate::shared::error::WalletError;
use crate::shared::types::{FeeEstimate, WalletResult};
use ethers::types::U256;

/// Gas price and EIP-1559 fee estimation against one network
#[derive(Clone)]
pub struct FeeOracle {
    rpc: EthRpc,
}

impl FeeOracle {
    pub fn new(rpc: EthRpc) -> Self {
        Self { rpc }
    }

    /// Legacy gas price
    pub async fn gas_price(&self) -> WalletResult<U256> {
        self.rpc.gas_price().await
    }

    /// Fee pair from recent fee history, falling back to the gas price and
    /// then to a fixed 20 gwei.
    pub async fn fee_data(&self) -> FeeEstimate {
        match self.fee_data_from_history().await {
            Ok(estimate) => return estimate,
            Err(e) => log::warn!("Fee history unavailable, falling back to gas price: {}", e),
        }

        let gas_price = match self.gas_price().await {
            Ok(price) => price,
            Err(e) => {
                log::warn!("Gas price unavailable, using default: {}", e);
                U256::from(DEFAULT_GAS_PRICE)
            }
        };
        FeeEstimate {
            max_fee_per_gas: gas_price,
            max_priority_fee_per_gas: gas_price / 2,
        }
    }

    /// Simulated gas plus a 20% margin; 21000 or 100000 when simulation fails
    pub async fn estimate_gas(&self, from: &str, to: &str, value: U256, data: &[u8]) -> U256 {
        match self.rpc.estimate_gas(from, to, value, data).await {
            Ok(estimate) => with_margin(estimate),
            Err(e) => {
                let fallback = if data.is_empty() { TRANSFER_GAS_LIMIT } else { CONTRACT_CALL_GAS_LIMIT };
                log::warn!("Gas estimation failed, using {}: {}", fallback, e);
                U256::from(fallback)
            }
        }
    }

    async fn fee_data_from_history(&self) -> WalletResult<FeeEstimate> {
        let history = self.rpc.fee_history(FEE_HISTORY_BLOCKS, &FEE_HISTORY_PERCENTILES).await?;

        // The last entry is the base fee of the next block
        let base_fee = *history
            .base_fee_per_gas
            .last()
            .ok_or_else(|| WalletError::rpc("eth_feeHistory", "empty baseFeePerGas"))?;

        let samples: Vec<U256> = history
            .reward
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| row.iter().fold(U256::zero(), |acc, r| acc.saturating_add(*r)) / U256::from(row.len()))
            .collect();
        let priority = if samples.is_empty() {
            U256::zero()
        } else {
            samples.iter().fold(U256::zero(), |acc, s| acc.saturating_add(*s)) / U256::from(samples.len())
        };
        let priority = priority.max(U256::from(MIN_PRIORITY_FEE));

        Ok(FeeEstimate {
            max_fee_per_gas: with_margin(base_fee).saturating_add(priority),
            max_priority_fee_per_gas: priority,
        })
    }
}

fn with_margin(value: U256) -> U256 {
    value.saturating_mul(U256::from(GAS_MARGIN_NUMERATOR)) / U256::from(GAS_MARGIN_DENOMINATOR)
}
