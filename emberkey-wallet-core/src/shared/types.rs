use ethers::types::U256;
use serde::{Deserialize, Serialize};

use super::error::WalletError;

// Basic types for wallet operations
pub type Address = String;
pub type TxHash = String;
pub type BlockNumber = u64;

/// Result type used inside the engine
pub type WalletResult<T> = Result<T, WalletError>;

/// Entropy size of a freshly generated mnemonic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MnemonicStrength {
    /// 128 bits, 12 words
    #[default]
    Words12,
    /// 256 bits, 24 words
    Words24,
}

impl MnemonicStrength {
    pub fn entropy_bytes(&self) -> usize {
        match self {
            MnemonicStrength::Words12 => 16,
            MnemonicStrength::Words24 => 32,
        }
    }

    pub fn word_count(&self) -> usize {
        match self {
            MnemonicStrength::Words12 => 12,
            MnemonicStrength::Words24 => 24,
        }
    }

    pub fn from_bits(bits: u32) -> Result<Self, WalletError> {
        match bits {
            128 => Ok(MnemonicStrength::Words12),
            256 => Ok(MnemonicStrength::Words24),
            other => Err(WalletError::validation(format!(
                "Unsupported mnemonic strength: {} bits",
                other
            ))),
        }
    }
}

/// EIP-1559 fee pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Caller-supplied values that replace what the engine would otherwise resolve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOverrides {
    pub nonce: Option<U256>,
    pub gas_limit: Option<U256>,
    pub fees: Option<FeeEstimate>,
}

/// Subset of `eth_getTransactionReceipt` the engine relies on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: BlockNumber,
    /// `true` when the receipt status is `0x1`
    pub success: bool,
    pub gas_used: Option<U256>,
}

/// Payload returned by `create_wallet`
#[derive(Debug)]
pub struct CreatedWallet {
    pub address: Address,
    pub mnemonic: crate::core::crypto::keys::SecureSeedPhrase,
}

/// Payload returned by sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentTransaction {
    pub hash: TxHash,
    pub raw: String,
    pub nonce: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mnemonic_strength() {
        assert_eq!(MnemonicStrength::Words12.entropy_bytes(), 16);
        assert_eq!(MnemonicStrength::Words24.word_count(), 24);
        assert_eq!(
            MnemonicStrength::from_bits(256).expect("Failed to parse strength"),
            MnemonicStrength::Words24
        );
        assert!(MnemonicStrength::from_bits(160).is_err());
    }
}
