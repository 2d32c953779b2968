//! Utility functions for the wallet core
//!
//! Hex and quantity helpers, address handling and the minimal big-endian
//! integer encoding used by the transaction codec.

use crate::shared::constants::ADDRESS_SIZE;
use crate::shared::error::WalletError;
use ethers::types::U256;
use sha3::{Digest, Keccak256};

/// Keccak-256 digest of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Big-endian bytes of `value` with every leading zero byte removed.
///
/// Zero encodes as an empty vector.
pub fn to_minimal_bytes(value: U256) -> Vec<u8> {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let first = buf.iter().position(|b| *b != 0).unwrap_or(buf.len());
    buf[first..].to_vec()
}

/// Strip leading zero bytes from an arbitrary big-endian integer
pub fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

/// Parse a JSON-RPC hex quantity (`0x1a`)
pub fn parse_quantity(value: &str) -> Result<U256, WalletError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| WalletError::validation(format!("Quantity must start with 0x: {}", value)))?;
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| WalletError::validation(format!("Invalid quantity {}: {}", value, e)))
}

/// Parse a hex quantity that must fit in a `u64`
pub fn parse_quantity_u64(value: &str) -> Result<u64, WalletError> {
    let quantity = parse_quantity(value)?;
    if quantity > U256::from(u64::MAX) {
        return Err(WalletError::validation(format!("Quantity out of range: {}", value)));
    }
    Ok(quantity.as_u64())
}

/// Format a JSON-RPC hex quantity without leading zeros
pub fn format_quantity(value: U256) -> String {
    format!("{:#x}", value)
}

/// `0x`-prefixed lowercase hex of arbitrary bytes
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with or without a `0x` prefix
pub fn decode_hex(value: &str) -> Result<Vec<u8>, WalletError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    Ok(hex::decode(digits)?)
}

/// Validate Ethereum address format
pub fn validate_ethereum_address(address: &str) -> Result<(), WalletError> {
    if !address.starts_with("0x") && !address.starts_with("0X") {
        return Err(WalletError::validation("Address must start with 0x"));
    }

    if address.len() != 2 + ADDRESS_SIZE * 2 {
        return Err(WalletError::validation("Address must be 42 characters long"));
    }

    if !address[2..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WalletError::validation("Address contains invalid hex characters"));
    }

    Ok(())
}

/// Lowercase `0x` form of a validated address
pub fn normalize_address(address: &str) -> Result<String, WalletError> {
    validate_ethereum_address(address)?;
    Ok(format!("0x{}", address[2..].to_ascii_lowercase()))
}

/// Raw 20 bytes of a validated address
pub fn address_bytes(address: &str) -> Result<[u8; ADDRESS_SIZE], WalletError> {
    validate_ethereum_address(address)?;
    let mut out = [0u8; ADDRESS_SIZE];
    hex::decode_to_slice(&address[2..], &mut out)?;
    Ok(out)
}

/// Decimal ether string to wei
pub fn parse_ether(amount: &str) -> Result<U256, WalletError> {
    ethers::utils::parse_ether(amount)
        .map_err(|e| WalletError::validation(format!("Invalid ether amount {}: {}", amount, e)))
}

/// Decimal token amount to base units
pub fn parse_units(amount: &str, decimals: u32) -> Result<U256, WalletError> {
    ethers::utils::parse_units(amount, decimals)
        .map(Into::into)
        .map_err(|e| WalletError::validation(format!("Invalid amount {}: {}", amount, e)))
}

/// Base units to a decimal string
pub fn format_units(value: U256, decimals: u32) -> Result<String, WalletError> {
    ethers::utils::format_units(value, decimals)
        .map_err(|e| WalletError::validation(format!("Cannot format amount: {}", e)))
}
