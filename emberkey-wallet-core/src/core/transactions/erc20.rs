//! ERC-20 calldata

use crate::shared::constants::{ERC20_BALANCE_OF_SELECTOR, ERC20_TRANSFER_SELECTOR};
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use crate::shared::utils::address_bytes;
use ethers::types::U256;

/// `transfer(address,uint256)`
pub fn transfer_calldata(to: &str, amount: U256) -> WalletResult<Vec<u8>> {
    let mut data = Vec::with_capacity(4 + 64);
    data.extend_from_slice(&ERC20_TRANSFER_SELECTOR);
    data.extend_from_slice(&encode_address(to)?);
    data.extend_from_slice(&encode_uint(amount));
    Ok(data)
}

/// `balanceOf(address)`
pub fn balance_of_calldata(owner: &str) -> WalletResult<Vec<u8>> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&ERC20_BALANCE_OF_SELECTOR);
    data.extend_from_slice(&encode_address(owner)?);
    Ok(data)
}

/// First word of an `eth_call` return value
pub fn decode_uint(output: &[u8]) -> WalletResult<U256> {
    if output.len() < 32 {
        return Err(WalletError::validation(format!(
            "Expected a 32-byte word, got {} bytes",
            output.len()
        )));
    }
    Ok(U256::from_big_endian(&output[..32]))
}

fn encode_address(address: &str) -> WalletResult<[u8; 32]> {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&address_bytes(address)?);
    Ok(word)
}

fn encode_uint(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}
