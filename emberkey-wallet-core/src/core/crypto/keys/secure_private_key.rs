use crate::shared::constants::PRIVATE_KEY_SIZE;
use crate::shared::error::WalletError;
use rand_core::{OsRng, RngCore};
use secp256k1::SecretKey;
use zeroize::Zeroize;

/// In-memory private key owned by the key manager.
///
/// The raw bytes never leave this type; callers borrow a `SecretKey` for the
/// duration of a closure via [`SecurePrivateKey::with_key`].
pub struct SecurePrivateKey {
    bytes: [u8; PRIVATE_KEY_SIZE],
    wiped: bool,
}

impl SecurePrivateKey {
    /// Take ownership of key bytes after checking they are a valid secp256k1 scalar
    pub fn from_bytes(bytes: [u8; PRIVATE_KEY_SIZE]) -> Result<Self, WalletError> {
        let mut secret_key = SecretKey::from_byte_array(bytes)
            .map_err(|_| WalletError::crypto("Invalid private key"))?;
        secret_key.non_secure_erase();
        Ok(Self { bytes, wiped: false })
    }

    /// Perform cryptographic operations without exposing the key
    pub fn with_key<F, T>(&self, f: F) -> Result<T, WalletError>
    where
        F: FnOnce(&SecretKey) -> Result<T, WalletError>,
    {
        if self.wiped {
            return Err(WalletError::NotInitialized);
        }
        let mut secret_key = SecretKey::from_byte_array(self.bytes)
            .map_err(|_| WalletError::crypto("Invalid private key"))?;
        let result = f(&secret_key);
        secret_key.non_secure_erase();
        result
    }

    /// Overwrite the key with random bytes, then zero it. Idempotent.
    pub fn wipe(&mut self) {
        if self.wiped {
            return;
        }
        OsRng.fill_bytes(&mut self.bytes);
        self.bytes.zeroize();
        self.wiped = true;
    }

    pub fn is_wiped(&self) -> bool {
        self.wiped
    }
}

// No Debug implementation to prevent key exposure in logs
// No Clone implementation to prevent accidental key duplication

impl Drop for SecurePrivateKey {
    fn drop(&mut self) {
        self.wipe();
    }
}
