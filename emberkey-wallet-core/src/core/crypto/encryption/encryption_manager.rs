use super::EncryptedData;
use crate::core::crypto::password::{derive_key, KdfConfig};
use crate::shared::constants::{NONCE_SIZE, SALT_SIZE};
use crate::shared::error::WalletError;
use crate::shared::WalletResult;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

/// Password-based AES-256-GCM sealing
#[derive(Debug, Clone, Copy)]
pub struct EncryptionManager {
    kdf: KdfConfig,
}

impl EncryptionManager {
    pub fn new(kdf: KdfConfig) -> Self {
        Self { kdf }
    }

    pub fn kdf(&self) -> &KdfConfig {
        &self.kdf
    }

    /// Seal `plaintext` under a key derived from `password` and a fresh salt and nonce
    pub fn seal(&self, plaintext: &[u8], password: &[u8]) -> WalletResult<EncryptedData> {
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut salt)
            .and_then(|_| OsRng.try_fill_bytes(&mut nonce))
            .map_err(|e| WalletError::crypto(format!("Entropy source unavailable: {}", e)))?;

        let key = derive_key(password, &salt, &self.kdf)?;
        let cipher = Aes256Gcm::new(&Key::<Aes256Gcm>::from(*key));
        let ciphertext = cipher
            .encrypt(&Nonce::from(nonce), plaintext)
            .map_err(|e| WalletError::crypto(format!("AES-GCM encryption failed: {}", e)))?;

        Ok(EncryptedData { salt, nonce, ciphertext })
    }

    /// Open a sealed blob. Any authentication failure is `DecryptionFailed`.
    pub fn open(&self, sealed: &EncryptedData, password: &[u8]) -> WalletResult<Zeroizing<Vec<u8>>> {
        let key = derive_key(password, &sealed.salt, &self.kdf)?;
        let cipher = Aes256Gcm::new(&Key::<Aes256Gcm>::from(*key));
        cipher
            .decrypt(&Nonce::from(sealed.nonce), sealed.ciphertext.as_slice())
            .map(Zeroizing::new)
            .map_err(|_| WalletError::DecryptionFailed)
    }
}
