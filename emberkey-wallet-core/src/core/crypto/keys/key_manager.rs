//! Key generation and management
//!
//! Mnemonic generation and validation, BIP32/44 derivation of the single
//! account key, address computation and the signing primitives. The key
//! manager never persists anything.

use super::{SecurePrivateKey, SecureSeedPhrase};
use crate::shared::constants::{DERIVATION_PATH, PERSONAL_MESSAGE_PREFIX, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
use crate::shared::error::WalletError;
use crate::shared::types::{Address, MnemonicStrength, WalletResult};
use crate::shared::utils::{keccak256, to_hex_prefixed};
use bip32::{DerivationPath, XPrv};
use bip39::{Language, Mnemonic};
use rand_core::{OsRng, RngCore};
use secp256k1::{Message, PublicKey, Secp256k1};
use std::str::FromStr;
use zeroize::Zeroizing;

/// ECDSA signature split into its transaction fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// 0 or 1
    pub y_parity: u8,
}

impl RecoverableSignature {
    /// 65-byte `r ‖ s ‖ v` with `v = 27 + parity`
    pub fn to_eth_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = 27 + self.y_parity;
        out
    }
}

struct KeyPair {
    private_key: SecurePrivateKey,
    public_key: [u8; PUBLIC_KEY_SIZE],
    address: Address,
}

/// Owner of the single account key pair
pub struct KeyManager {
    secp256k1: Secp256k1<secp256k1::All>,
    key_pair: Option<KeyPair>,
}

impl KeyManager {
    pub fn new() -> Self {
        Self {
            secp256k1: Secp256k1::new(),
            key_pair: None,
        }
    }

    /// Generate a fresh mnemonic and load its account key
    pub fn generate(&mut self, strength: MnemonicStrength) -> WalletResult<(SecureSeedPhrase, Address)> {
        let mut buffer = Zeroizing::new([0u8; 32]);
        let entropy = &mut buffer[..strength.entropy_bytes()];
        OsRng
            .try_fill_bytes(entropy)
            .map_err(|e| WalletError::crypto(format!("Entropy source unavailable: {}", e)))?;

        let mnemonic = Mnemonic::from_entropy(entropy)
            .map_err(|e| WalletError::crypto(format!("Failed to encode mnemonic: {}", e)))?;
        let phrase = SecureSeedPhrase::new(&Zeroizing::new(mnemonic.to_string()));
        let address = self.import_from_mnemonic(phrase.as_str())?;
        Ok((phrase, address))
    }

    /// Validate `words` and load the derived account key
    pub fn import_from_mnemonic(&mut self, words: &str) -> WalletResult<Address> {
        let private_key = Self::derive_private_key(words)?;
        self.load_private_key(*private_key)
    }

    /// Address of `words` without touching the loaded key pair
    pub fn derive_address(&self, words: &str) -> WalletResult<Address> {
        let private_key = Self::derive_private_key(words)?;
        let key = SecurePrivateKey::from_bytes(*private_key)?;
        let (_, address) = self.public_identity(&key)?;
        Ok(address)
    }

    /// Checksum and wordlist check
    pub fn validate_mnemonic(words: &str) -> bool {
        let normalized = SecureSeedPhrase::new(words);
        Mnemonic::parse_in_normalized(Language::English, &normalized.as_str().to_lowercase()).is_ok()
    }

    pub(crate) fn load_private_key(&mut self, bytes: [u8; PRIVATE_KEY_SIZE]) -> WalletResult<Address> {
        self.wipe();
        let private_key = SecurePrivateKey::from_bytes(bytes)?;
        let (public_key, address) = self.public_identity(&private_key)?;
        self.key_pair = Some(KeyPair {
            private_key,
            public_key,
            address: address.clone(),
        });
        log::debug!("Key pair loaded for {}", address);
        Ok(address)
    }

    /// True iff both a private key and an address are loaded
    pub fn is_initialized(&self) -> bool {
        self.key_pair
            .as_ref()
            .map_or(false, |kp| !kp.private_key.is_wiped() && !kp.address.is_empty())
    }

    pub fn address(&self) -> WalletResult<&str> {
        self.loaded().map(|kp| kp.address.as_str())
    }

    /// Uncompressed SEC1 public key
    pub fn public_key(&self) -> WalletResult<[u8; PUBLIC_KEY_SIZE]> {
        self.loaded().map(|kp| kp.public_key)
    }

    /// ECDSA over a 32-byte digest
    pub fn sign_hash(&self, hash: &[u8; 32]) -> WalletResult<RecoverableSignature> {
        let key_pair = self.loaded()?;
        let message = Message::from_digest(*hash);
        key_pair.private_key.with_key(|secret_key| {
            let signature = self.secp256k1.sign_ecdsa_recoverable(message, secret_key);
            let (recovery_id, compact) = signature.serialize_compact();
            let mut r = [0u8; 32];
            let mut s = [0u8; 32];
            r.copy_from_slice(&compact[..32]);
            s.copy_from_slice(&compact[32..]);
            Ok(RecoverableSignature {
                r,
                s,
                y_parity: i32::from(recovery_id) as u8,
            })
        })
    }

    /// EIP-191 `personal_sign`, returned as `0x` + r ‖ s ‖ v
    pub fn sign_message(&self, message: &[u8]) -> WalletResult<String> {
        let digest = Self::personal_message_hash(message);
        let signature = self.sign_hash(&digest)?;
        Ok(to_hex_prefixed(&signature.to_eth_bytes()))
    }

    pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
        let mut payload = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 20 + message.len());
        payload.extend_from_slice(PERSONAL_MESSAGE_PREFIX.as_bytes());
        payload.extend_from_slice(message.len().to_string().as_bytes());
        payload.extend_from_slice(message);
        keccak256(&payload)
    }

    /// Hex private key for the audited reveal path
    pub(crate) fn reveal_private_key(&self) -> WalletResult<Zeroizing<String>> {
        self.loaded()?
            .private_key
            .with_key(|secret_key| Ok(Zeroizing::new(to_hex_prefixed(&Zeroizing::new(secret_key.secret_bytes())[..]))))
    }

    /// Destroy the loaded key pair. Safe to call repeatedly.
    pub fn wipe(&mut self) {
        if let Some(mut key_pair) = self.key_pair.take() {
            key_pair.private_key.wipe();
            log::debug!("Key pair wiped for {}", key_pair.address);
        }
    }

    fn loaded(&self) -> WalletResult<&KeyPair> {
        match &self.key_pair {
            Some(kp) if !kp.private_key.is_wiped() => Ok(kp),
            _ => Err(WalletError::NotInitialized),
        }
    }

    fn public_identity(&self, key: &SecurePrivateKey) -> WalletResult<([u8; PUBLIC_KEY_SIZE], Address)> {
        key.with_key(|secret_key| {
            let public_key = PublicKey::from_secret_key(&self.secp256k1, secret_key).serialize_uncompressed();
            // Drop the 0x04 prefix before hashing
            let hash = keccak256(&public_key[1..]);
            Ok((public_key, to_hex_prefixed(&hash[12..])))
        })
    }

    fn derive_private_key(words: &str) -> WalletResult<Zeroizing<[u8; PRIVATE_KEY_SIZE]>> {
        let phrase = SecureSeedPhrase::new(words);
        let lowered = Zeroizing::new(phrase.as_str().to_lowercase());
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, &lowered)
            .map_err(|e| WalletError::invalid_mnemonic(e.to_string()))?;

        let seed = Zeroizing::new(mnemonic.to_seed_normalized(""));
        let xprv = XPrv::new(&seed[..])
            .map_err(|e| WalletError::crypto(format!("Failed to create XPrv: {}", e)))?;

        let derivation_path = DerivationPath::from_str(DERIVATION_PATH)
            .map_err(|e| WalletError::crypto(format!("Invalid derivation path: {}", e)))?;

        let mut child_xprv = xprv;
        for child_number in derivation_path.iter() {
            child_xprv = child_xprv
                .derive_child(child_number)
                .map_err(|e| WalletError::crypto(format!("Failed to derive child XPrv: {}", e)))?;
        }

        let mut private_key = Zeroizing::new([0u8; PRIVATE_KEY_SIZE]);
        private_key.copy_from_slice(&child_xprv.private_key().to_bytes());
        Ok(private_key)
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KeyManager {
    fn drop(&mut self) {
        self.wipe();
    }
}
