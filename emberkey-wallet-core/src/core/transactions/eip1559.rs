//! EIP-1559 (type 2) transaction encoding
//!
//! Payload: `0x02 ‖ rlp([chainId, nonce, maxPriorityFeePerGas, maxFeePerGas,
//! gasLimit, to, value, data, accessList])`. The signed form appends
//! `[yParity, r, s]`. Integers are always minimal big-endian.

use crate::core::crypto::keys::RecoverableSignature;
use crate::shared::constants::{ADDRESS_SIZE, EIP1559_TX_TYPE};
use crate::shared::utils::{keccak256, to_hex_prefixed, to_minimal_bytes, trim_leading_zeros};
use ethers::types::U256;
use rlp::RlpStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub chain_id: u64,
    pub nonce: U256,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: U256,
    pub to: [u8; ADDRESS_SIZE],
    pub value: U256,
    pub data: Vec<u8>,
}

impl UnsignedTx {
    /// Bytes that get hashed for signing
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        typed(stream)
    }

    pub fn sighash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Raw signed transaction bytes, ready for `eth_sendRawTransaction`
    pub fn encode_signed(&self, signature: &RecoverableSignature) -> Vec<u8> {
        let mut stream = RlpStream::new_list(12);
        self.append_fields(&mut stream);
        stream.append(&signature.y_parity);
        stream.append(&trim_leading_zeros(&signature.r).to_vec());
        stream.append(&trim_leading_zeros(&signature.s).to_vec());
        typed(stream)
    }

    /// Upper bound on what the transaction can cost
    pub fn max_cost(&self) -> Option<U256> {
        self.gas_limit
            .checked_mul(self.max_fee_per_gas)
            .and_then(|gas| gas.checked_add(self.value))
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        append_uint(stream, U256::from(self.chain_id));
        append_uint(stream, self.nonce);
        append_uint(stream, self.max_priority_fee_per_gas);
        append_uint(stream, self.max_fee_per_gas);
        append_uint(stream, self.gas_limit);
        stream.append(&self.to.to_vec());
        append_uint(stream, self.value);
        stream.append(&self.data);
        stream.begin_list(0);
    }
}

/// Signed raw transaction and its hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub raw: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTx {
    pub fn new(raw: Vec<u8>) -> Self {
        let hash = keccak256(&raw);
        Self { raw, hash }
    }

    pub fn raw_hex(&self) -> String {
        to_hex_prefixed(&self.raw)
    }

    pub fn hash_hex(&self) -> String {
        to_hex_prefixed(&self.hash)
    }
}

fn append_uint(stream: &mut RlpStream, value: U256) {
    stream.append(&to_minimal_bytes(value));
}

fn typed(stream: RlpStream) -> Vec<u8> {
    let body = stream.out();
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(EIP1559_TX_TYPE);
    out.extend_from_slice(&body);
    out
}
